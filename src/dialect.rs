//! Delimiter and quoting conventions, and the sniffer that guesses them.
//!
//! A [`Dialect`] is a fixed-field record persisted inside the metadata
//! layout. [`sniff`] scores a handful of candidate delimiters by how
//! uniformly they split the sample lines and returns `None` when nothing
//! splits the sample consistently.

use std::{borrow::Cow, sync::LazyLock};

use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PhenoError, Result};

/// Number of non-comment lines handed to the sniffer.
pub const SNIFF_SAMPLE_LINES: usize = 50;

const CANDIDATE_DELIMITERS: &[u8] = b"\t,|;";
const CONSISTENCY_THRESHOLD: f64 = 0.9;
const DEFAULT_LINE_TERMINATOR: &str = "\r\n";

static QUOTED_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[\t,|; ])(["'])[^"'\t,|;]*["'](?:$|[\t,|; ])"#)
        .expect("quoted field pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialect {
    #[serde(with = "byte_char")]
    pub delimiter: u8,
    #[serde(with = "byte_char", default = "default_quote")]
    pub quote: u8,
    #[serde(
        with = "opt_byte_char",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub escape: Option<u8>,
    #[serde(default = "default_true")]
    pub double_quote: bool,
    #[serde(default = "default_line_terminator")]
    pub line_terminator: String,
    /// Runs of spaces and tabs act as a single delimiter.
    #[serde(default)]
    pub collapse_whitespace: bool,
}

fn default_quote() -> u8 {
    b'"'
}

fn default_true() -> bool {
    true
}

fn default_line_terminator() -> String {
    DEFAULT_LINE_TERMINATOR.to_string()
}

impl Default for Dialect {
    fn default() -> Self {
        Self::with_delimiter(b',')
    }
}

impl Dialect {
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            delimiter,
            quote: default_quote(),
            escape: None,
            double_quote: true,
            line_terminator: default_line_terminator(),
            collapse_whitespace: false,
        }
    }

    pub fn whitespace() -> Self {
        Self {
            collapse_whitespace: true,
            ..Self::with_delimiter(b' ')
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.delimiter.is_ascii() || !self.quote.is_ascii() {
            return Err(PhenoError::InvalidDialect(
                "delimiter and quote must be ASCII".to_string(),
            ));
        }
        if self.delimiter == self.quote {
            return Err(PhenoError::InvalidDialect(format!(
                "delimiter and quote are both '{}'",
                self.delimiter as char
            )));
        }
        if self.line_terminator.is_empty() {
            return Err(PhenoError::InvalidDialect(
                "line terminator cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn terminator(&self) -> csv::Terminator {
        match self.line_terminator.as_bytes() {
            [byte] if *byte != b'\n' && *byte != b'\r' => csv::Terminator::Any(*byte),
            _ => csv::Terminator::CRLF,
        }
    }

    /// A headerless, flexible reader; row widths are checked by the caller
    /// so errors can name the offending row.
    pub fn reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .quote(self.quote)
            .escape(self.escape)
            .double_quote(self.double_quote)
            .terminator(self.terminator());
        builder
    }

    /// Normalizes one physical line before it reaches the CSV parser.
    /// `in_quotes` is whether the line continues an open quoted field;
    /// whitespace runs are collapsed only outside quoted spans.
    pub fn prepare_line<'a>(&self, line: &'a str, in_quotes: bool) -> Cow<'a, str> {
        if !self.collapse_whitespace {
            return Cow::Borrowed(line);
        }
        let quote = self.quote as char;
        let escape = self.escape.map(char::from);
        let mut prepared = String::with_capacity(line.len());
        let mut quoted = in_quotes;
        let mut escaped = false;
        let mut gap = false;
        for ch in line.chars() {
            if quoted {
                prepared.push(ch);
                if escaped {
                    escaped = false;
                } else if Some(ch) == escape {
                    escaped = true;
                } else if ch == quote {
                    quoted = false;
                }
                continue;
            }
            if ch == ' ' || ch == '\t' {
                gap = true;
                continue;
            }
            if gap && !prepared.is_empty() {
                prepared.push(self.delimiter as char);
            }
            gap = false;
            if ch == quote {
                quoted = true;
            }
            prepared.push(ch);
        }
        Cow::Owned(prepared)
    }

    /// Whether a quoted field is still open after `line`.
    pub fn quote_open_after(&self, line: &str, in_quotes: bool) -> bool {
        let mut quoted = in_quotes;
        let mut bytes = line.bytes();
        while let Some(byte) = bytes.next() {
            if quoted && Some(byte) == self.escape {
                bytes.next();
            } else if byte == self.quote {
                quoted = !quoted;
            }
        }
        quoted
    }

    /// Splits a single line (e.g. a comment carrying column names).
    pub fn split_line(&self, line: &str) -> Result<Vec<String>> {
        let prepared = self.prepare_line(line, false);
        let mut reader = self.reader_builder().from_reader(prepared.as_bytes());
        let mut record = csv::StringRecord::new();
        if reader.read_record(&mut record)? {
            Ok(record.iter().map(str::to_string).collect())
        } else {
            Ok(Vec::new())
        }
    }

    pub fn describe_delimiter(&self) -> String {
        if self.collapse_whitespace {
            return "whitespace".to_string();
        }
        crate::printable_delimiter(self.delimiter)
    }
}

/// Guesses a dialect from sample lines (comments already removed).
pub fn sniff(sample: &str) -> Option<Dialect> {
    let lines = sample
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>();
    if lines.is_empty() {
        return None;
    }
    let quote = guess_quote(&lines);

    let mut best: Option<(f64, u8)> = None;
    for &delimiter in CANDIDATE_DELIMITERS {
        let counts = lines
            .iter()
            .map(|line| count_outside_quotes(line, delimiter, quote))
            .collect::<Vec<_>>();
        let Some(consistency) = consistency(&counts) else {
            continue;
        };
        if consistency < CONSISTENCY_THRESHOLD {
            continue;
        }
        if best.is_none_or(|(score, _)| consistency > score) {
            best = Some((consistency, delimiter));
        }
    }

    if let Some((_, delimiter)) = best {
        let mut dialect = Dialect::with_delimiter(delimiter);
        dialect.quote = quote;
        return Some(dialect);
    }

    let widths = lines
        .iter()
        .map(|line| line.split_whitespace().count().saturating_sub(1))
        .collect::<Vec<_>>();
    match consistency(&widths) {
        Some(score) if score >= CONSISTENCY_THRESHOLD => {
            let mut dialect = Dialect::whitespace();
            dialect.quote = quote;
            Some(dialect)
        }
        _ => None,
    }
}

/// Share of lines agreeing on the most common non-zero count.
fn consistency(counts: &[usize]) -> Option<f64> {
    let (mode, hits) = counts
        .iter()
        .counts()
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))?;
    if *mode == 0 {
        return None;
    }
    Some(hits as f64 / counts.len() as f64)
}

fn count_outside_quotes(line: &str, delimiter: u8, quote: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for byte in line.bytes() {
        if byte == quote {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

fn guess_quote(lines: &[&str]) -> u8 {
    let mut double = 0usize;
    let mut single = 0usize;
    for line in lines {
        for captures in QUOTED_FIELD.captures_iter(line) {
            match captures.get(1).map(|m| m.as_str()) {
                Some("'") => single += 1,
                Some(_) => double += 1,
                None => {}
            }
        }
    }
    if single > double { b'\'' } else { b'"' }
}

mod byte_char {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &u8, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&(*value as char).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(de::Error::custom)
    }

    pub(super) fn parse(raw: &str) -> Result<u8, String> {
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if ch.is_ascii() => Ok(ch as u8),
            _ => Err(format!("expected a single ASCII character, found '{raw}'")),
        }
    }
}

mod opt_byte_char {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &Option<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(byte) => super::byte_char::serialize(byte, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u8>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| super::byte_char::parse(&raw).map_err(de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_tab_separated_sample() {
        let sample = "id\tage\tsex\n1\t34\tM\n2\t51\tF\n";
        let dialect = sniff(sample).expect("dialect");
        assert_eq!(dialect.delimiter, b'\t');
        assert!(!dialect.collapse_whitespace);
    }

    #[test]
    fn sniffs_comma_with_quoted_commas() {
        let sample = "name,notes\n\"Smith, J\",ok\n\"Doe, A\",late\n";
        let dialect = sniff(sample).expect("dialect");
        assert_eq!(dialect.delimiter, b',');
        assert_eq!(dialect.quote, b'"');
    }

    #[test]
    fn sniffs_pipe_separated_sample() {
        let sample = "a|b|c\n1|2|3\n4|5|6";
        assert_eq!(sniff(sample).expect("dialect").delimiter, b'|');
    }

    #[test]
    fn collapsing_keeps_quoted_spans() {
        let dialect = Dialect::whitespace();
        assert_eq!(
            dialect.prepare_line("  S1   \"New  York\"\t 3 ", false),
            "S1 \"New  York\" 3"
        );
        assert_eq!(dialect.prepare_line("  tail\"  x   y", true), "  tail\" x y");
    }

    #[test]
    fn quote_state_spans_lines() {
        let dialect = Dialect::default();
        assert!(dialect.quote_open_after("1,\"a", false));
        assert!(dialect.quote_open_after("", true));
        assert!(!dialect.quote_open_after("b\"\"c\"", true));
        assert!(!dialect.quote_open_after("2,\"x\"\"y\"", false));
    }

    #[test]
    fn falls_back_to_whitespace_runs() {
        let sample = "fam1  ind1 0 0 1\nfam1  ind2 0 0 2\nfam2 ind3   0 0 1\n";
        let dialect = sniff(sample).expect("dialect");
        assert!(dialect.collapse_whitespace);
        assert_eq!(
            dialect.split_line("fam2 ind3   0 0 1").expect("split"),
            vec!["fam2", "ind3", "0", "0", "1"]
        );
    }

    #[test]
    fn single_column_sample_is_undetermined() {
        assert!(sniff("alpha\nbeta\ngamma\n").is_none());
        assert!(sniff("").is_none());
    }

    #[test]
    fn split_line_honours_quotes() {
        let dialect = Dialect::default();
        assert_eq!(
            dialect.split_line("\"a,b\",c").expect("split"),
            vec!["a,b", "c"]
        );
    }

    #[test]
    fn dialect_serializes_bytes_as_characters() {
        let dialect = Dialect::with_delimiter(b'\t');
        let json = serde_json::to_value(&dialect).expect("serialize");
        assert_eq!(json["delimiter"], "\t");
        assert_eq!(json["quote"], "\"");
        assert!(json.get("escape").is_none());
        let back: Dialect = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, dialect);
    }

    #[test]
    fn rejects_multi_character_delimiter() {
        let json = serde_json::json!({ "delimiter": "ab" });
        assert!(serde_json::from_value::<Dialect>(json).is_err());
    }

    #[test]
    fn validate_rejects_delimiter_equal_to_quote() {
        let mut dialect = Dialect::default();
        dialect.quote = b',';
        assert!(dialect.validate().is_err());
    }
}
