//! Atomic classification of a single cell.
//!
//! Every token observed during a scan lands in exactly one [`RawType`]
//! bucket. The classifier is total: any string maps to some kind.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RawType {
    Empty,
    Int,
    Float,
    Bool,
    Str,
}

impl RawType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RawType::Empty => "_empty_",
            RawType::Int => "int",
            RawType::Float => "float",
            RawType::Bool => "bool",
            RawType::Str => "string",
        }
    }
}

impl fmt::Display for RawType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies one token.
///
/// Surrounding whitespace is ignored for the numeric test. Anything the
/// float parser accepts is a number, including `nan`, `inf` and literals
/// that overflow; a `.` makes it a float.
pub fn classify(token: &str) -> RawType {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return RawType::Empty;
    }
    if trimmed.parse::<f64>().is_ok() {
        return if trimmed.contains('.') {
            RawType::Float
        } else {
            RawType::Int
        };
    }
    if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
        return RawType::Bool;
    }
    RawType::Str
}
