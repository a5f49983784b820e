//! Error types for ddspice-burn.

use burn::record::RecorderError;
use thiserror::Error;

/// Error type for model construction and forward passes.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] ddspice_core::Error),

    /// A stage asked for a tensor its input map does not carry
    #[error("Missing tensor: {0}")]
    MissingTensor(String),

    /// A requested control key was not produced by the processor group
    #[error("Unknown control: {0}")]
    UnknownControl(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Tensor data could not be read back to the host
    #[error("Tensor data error: {0}")]
    TensorData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn missing_feature(name: &str) -> Self {
        Self::Core(ddspice_core::Error::MissingFeature(name.to_string()))
    }

    pub fn missing_argument(name: &str) -> Self {
        Self::Core(ddspice_core::Error::MissingArgument(name.to_string()))
    }

    pub fn shape_mismatch(field: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::Core(ddspice_core::Error::shape_mismatch(field, expected, actual))
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::Core(ddspice_core::Error::InvalidConfig(message.into()))
    }
}

impl From<RecorderError> for Error {
    fn from(e: RecorderError) -> Self {
        Error::Checkpoint(format!("{:?}", e))
    }
}

// Registry constructors report core errors
impl From<Error> for ddspice_core::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Core(inner) => inner,
            other => ddspice_core::Error::ConstructionFailed(other.to_string()),
        }
    }
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
