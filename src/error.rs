//! Error types for the unifrac-hotspot library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum UniFracError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Newick parse error at byte {pos}: {msg}")]
    NewickParse { pos: usize, msg: String },

    #[error("Invalid abundance value '{value}' at row {row}, column {col}")]
    InvalidAbundance {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Unsupported source for '{param}': {actual}")]
    UnsupportedType { param: &'static str, actual: String },

    #[error("Metric '{0}' not recognized")]
    UnsupportedMetric(String),

    #[error("Identifiers not found in tree: {0}")]
    InvalidTipSet(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Normalization undefined: {0}")]
    DivisionUndefined(String),

    #[error("Sample '{0}' not found in table")]
    SampleNotFound(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, UniFracError>;
