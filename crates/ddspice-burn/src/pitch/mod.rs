//! Pitch estimation: salience models and the soft-argmax decoder.

mod decoder;
mod estimator;

pub use decoder::{PitchDecoder, PitchEstimate, DEFAULT_BETA};
pub use estimator::{CrepeEstimator, CrepeEstimatorConfig};
