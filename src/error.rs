//! Error taxonomy for inference and extraction.
//!
//! Only contract violations at the read surface (an absent column, a row
//! whose width disagrees with the metadata) and genuine I/O or decoding
//! failures surface as [`PhenoError`]. Soft conditions such as an
//! undetermined dialect or an undecidable column class are logged and
//! degraded in place by the builder.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhenoError {
    #[error("can't find columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("row {row} has {found} field(s) but {expected} were expected")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid dialect: {0}")]
    InvalidDialect(String),

    #[error("unknown encoding '{0}'")]
    UnknownEncoding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PhenoError {
    fn from(err: serde_json::Error) -> Self {
        PhenoError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for PhenoError {
    fn from(err: serde_yaml::Error) -> Self {
        PhenoError::Serialization(err.to_string())
    }
}

pub type Result<T, E = PhenoError> = std::result::Result<T, E>;
