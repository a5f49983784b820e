//! Framework-agnostic building blocks for DDSPICE.
//!
//! Everything here is plain data: feature records exchanged between data
//! providers and models, loss reports, the CREPE pitch scale, experiment
//! configuration and a generic component registry. Tensor code lives in
//! `ddspice-burn`; audio augmentation in `ddspice-data`.

// Error types
mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{
    AugmentConfig, ComponentSpec, ConsistencyConfig, ConsistencyTarget, DataConfig,
    ExperimentConfig, ModelKind, ModelSpec, ResampleQuality,
};

pub mod features;
pub use features::{FeatureBatch, FeatureRecord, FeatureShape};

mod losses;
pub use losses::{LossReport, TOTAL_LOSS};

pub mod pitch;

pub mod registry;
pub use registry::{get_param, get_param_or, ComponentParams, Constructor, ParamValue, Registry};
