use std::path::PathBuf;

use thiserror::Error;

/// A timestamp that could not be turned into a calendar date-time.
///
/// Raised by the feature deriver; aborts the whole enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row {row}: cannot parse timestamp '{value}'")]
pub struct ParseError {
    /// Zero-based row index in the raw table.
    pub row: usize,
    /// The offending text (empty when the field was blank).
    pub value: String,
}

/// Everything that can go wrong while loading and enriching a data source.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("row {row}: null value in required column '{column}'")]
    NullValue { row: usize, column: String },

    #[error("row {row}: value {value} out of range for column '{column}'")]
    OutOfRange {
        row: usize,
        column: String,
        value: i64,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl DataError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A filter value typed by a user that does not name a valid choice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterParseError {
    #[error("unknown season '{0}' (expected Spring, Summer, Fall or Winter)")]
    Season(String),

    #[error("invalid year '{0}' (expected 'all' or a number)")]
    Year(String),

    #[error("invalid working-day value '{0}' (expected all, 0 or 1)")]
    WorkingDay(String),

    #[error("malformed filter term '{0}' (expected key=value)")]
    Term(String),
}

/// Errors while reading a JSON configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid working_day {0} in config (expected 0 or 1)")]
    WorkingDay(u8),
}
