//! # DDSPICE - DDSP autoencoder with pitch-consistency training
//!
//! A modular neural synthesis model that reconstructs audio from pitch and
//! loudness through differentiable signal processors, extended with a
//! trainable pitch estimator supervised by pitch-shifted copies of the input.
//!
//! ## Architecture
//!
//! DDSPICE is an umbrella crate that coordinates:
//! - **ddspice-core** - Feature records, loss reports, pitch scale, configuration, registry
//! - **ddspice-data** - Data providers, prefetching batches, pitch-shift augmentation
//! - **ddspice-burn** - Autoencoder, soft-argmax pitch decoder, consistency loss, checkpoints
//!
//! ## Quick Start
//!
//! ```ignore
//! use ddspice::prelude::*;
//!
//! let config = ExperimentConfig::load("ddspice.toml")?;
//! let device = Default::default();
//!
//! let registry = ModelRegistry::<TrainBackend>::default();
//! // register decoders and processor groups here
//! let mut model = registry.get_model(&config, &device)?;
//! model.restore(Path::new("runs/ddspice"), &device)?;
//!
//! let provider = Arc::new(AugmentedProvider::new(provider, &config.augmentation)?);
//! for batch in provider.get_batch(16, true, None)? {
//!     let features = Features::from_batch(&batch?, &device)?;
//!     let output = model.call(&features, true)?;
//!     let report = model.losses_dict(&output.losses)?;
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Everything below
//! - `data` - Data providers and pitch-shift augmentation

/// Re-export of ddspice-core for direct access
pub use ddspice_core as core;

/// Re-export of ddspice-burn for direct access
pub use ddspice_burn as model;

#[cfg(feature = "data")]
pub use ddspice_data as data;

// Configuration and plain data
pub use ddspice_core::{
    AugmentConfig, ComponentSpec, ConsistencyConfig, ConsistencyTarget, DataConfig,
    ExperimentConfig, FeatureBatch, FeatureRecord, FeatureShape, LossReport, ModelKind, ModelSpec,
    ResampleQuality, TOTAL_LOSS,
};

// Model
pub use ddspice_burn::{
    Autoencoder, AutoencoderBuilder, CrepeEstimator, CrepeEstimatorConfig, DefaultPreprocessor,
    Features, LossAccumulator, ModelOutput, ModelRegistry, PitchConsistency, PitchDecoder,
    TensorMap, WaveformLoss, PITCH_CONSISTENCY_LOSS,
};

#[cfg(feature = "data")]
pub use ddspice_data::{AugmentedProvider, BatchStream, DataProvider, MemoryProvider, PitchShifter};

mod error;
pub use error::{Error, Result};

/// Ready-made Burn backends.
pub mod backend {
    use burn::backend::wgpu::Wgpu;
    use burn::backend::{Autodiff, NdArray};

    /// CPU inference.
    pub type CpuBackend = NdArray<f32>;

    /// CPU training.
    pub type TrainBackend = Autodiff<CpuBackend>;

    /// GPU inference.
    pub type GpuBackend = Wgpu;

    /// GPU training.
    pub type GpuTrainBackend = Autodiff<GpuBackend>;
}

pub use backend::{CpuBackend, GpuBackend, GpuTrainBackend, TrainBackend};

/// Prelude
pub mod prelude {
    pub use crate::backend::{CpuBackend, GpuBackend, GpuTrainBackend, TrainBackend};
    pub use crate::{Error, Result};

    pub use ddspice_core::{
        ComponentSpec, ConsistencyTarget, DataConfig, ExperimentConfig, FeatureBatch,
        FeatureRecord, LossReport, ModelKind,
    };

    pub use ddspice_burn::{
        Autoencoder, Decoder, Encoder, Features, LossAccumulator, LossObject, ModelOutput,
        ModelRegistry, PitchEstimator, Preprocessor, ProcessorGroup, Restorable, TensorMap,
    };

    #[cfg(feature = "data")]
    pub use ddspice_data::{AugmentedProvider, DataProvider, MemoryProvider};

    pub use std::path::Path;
    pub use std::sync::Arc;
}
