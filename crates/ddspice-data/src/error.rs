//! Error types for ddspice-data

use thiserror::Error;

/// Data pipeline error type
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] ddspice_core::Error),

    /// Invalid argument to a provider or augmenter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resampling error
    #[error("Resampling error: {0}")]
    Resample(String),

    /// The loader thread could not be started
    #[error("Loader error: {0}")]
    Loader(String),
}

/// Result type for data operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<rubato::ResamplerConstructionError> for Error {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        Error::Resample(e.to_string())
    }
}

impl From<rubato::ResampleError> for Error {
    fn from(e: rubato::ResampleError) -> Self {
        Error::Resample(e.to_string())
    }
}
