//! Error types for ddspice-core.

use thiserror::Error;

/// Error type for ddspice-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    #[error("Unknown {kind} type: {name}")]
    UnknownComponent { kind: String, name: String },

    /// A registered constructor failed for a reason of its own
    #[error("Construction failed: {0}")]
    ConstructionFailed(String),

    #[error("Invalid parameter '{0}': {1}")]
    InvalidParameter(String, String),

    #[error("Shape mismatch for '{field}': expected {expected}, got {actual}")]
    ShapeMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("Missing feature: {0}")]
    MissingFeature(String),

    #[error("Empty batch")]
    EmptyBatch,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub fn shape_mismatch(field: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            field: field.into(),
            expected,
            actual,
        }
    }
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
