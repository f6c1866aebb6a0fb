//! Header detection.
//!
//! Exactly one source is chosen per file, in this order: the first row
//! (when it holds more string tokens than the column types predict), the
//! last leading comment line (when its width matches and it is almost all
//! strings), or synthesized positional names.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    column_class::{InferredColumn, ValueType},
    raw_type::{RawType, classify},
};

const COMMENT_HEADER_STRING_RATIO: f64 = 0.9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderSource {
    FirstRow,
    Comment,
    #[default]
    Position,
}

impl fmt::Display for HeaderSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HeaderSource::FirstRow => "firstrow",
            HeaderSource::Comment => "comment",
            HeaderSource::Position => "position",
        };
        f.write_str(label)
    }
}

impl HeaderSource {
    /// Physical lines to discard before data, given the leading
    /// comment/blank block length.
    pub fn skip(&self, leading_lines: usize) -> usize {
        match self {
            HeaderSource::FirstRow => leading_lines + 1,
            HeaderSource::Comment | HeaderSource::Position => leading_lines,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderDecision {
    pub names: Vec<String>,
    pub source: HeaderSource,
}

pub fn positional_names(count: usize) -> Vec<String> {
    (0..count).map(|idx| format!("COL{idx}")).collect()
}

/// `columns` are the provisional inferences from the body, excluding the
/// first row.
pub fn detect_header(
    first_row: &[String],
    last_comment: Option<&[String]>,
    columns: &[InferredColumn],
) -> HeaderDecision {
    let row_strings = first_row
        .iter()
        .filter(|token| classify(token) == RawType::Str)
        .count();
    let expected_strings = columns
        .iter()
        .take(first_row.len())
        .filter(|column| column.value_type == ValueType::Str)
        .count();
    if row_strings > expected_strings {
        return HeaderDecision {
            names: first_row.iter().map(|name| name.trim().to_string()).collect(),
            source: HeaderSource::FirstRow,
        };
    }

    if let Some(comment) = last_comment
        && !comment.is_empty()
        && comment.len() == columns.len()
    {
        let strings = comment
            .iter()
            .filter(|token| classify(token) == RawType::Str)
            .count();
        if strings as f64 / comment.len() as f64 > COMMENT_HEADER_STRING_RATIO {
            return HeaderDecision {
                names: comment.iter().map(|name| name.trim().to_string()).collect(),
                source: HeaderSource::Comment,
            };
        }
    }

    HeaderDecision {
        names: positional_names(columns.len()),
        source: HeaderSource::Position,
    }
}
