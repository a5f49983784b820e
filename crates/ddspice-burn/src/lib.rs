//! Burn implementation of the DDSP autoencoder and its pitch-consistency
//! variant.
//!
//! Stages are boxed trait objects generic over a Burn [`Backend`](burn::prelude::Backend).
//! Attaching a [`PitchConsistency`] to the [`Autoencoder`] makes it estimate
//! pitch from audio with a trainable salience model and the soft-argmax
//! [`PitchDecoder`], and record a consistency loss against pitch-shifted audio.
//!
//! ```rust,ignore
//! use burn::backend::{Autodiff, NdArray};
//! use ddspice_burn::{Features, ModelRegistry};
//!
//! type B = Autodiff<NdArray>;
//!
//! let registry = ModelRegistry::<B>::default();
//! registry.decoders.register("rnn_fc", my_decoder_constructor);
//! registry.processor_groups.register("harmonic_noise", my_processor_group_constructor);
//!
//! let mut model = registry.get_model(&config, &device)?;
//! model.restore(Path::new("runs/ddspice"), &device)?;
//!
//! let features = Features::from_batch(&batch, &device)?;
//! let output = model.call(&features, true)?;
//! let total = output.losses.total();
//! ```

// Error types
mod error;
pub use error::{Error, Result};

mod features;
pub use features::Features;

mod tensor_map;
pub use tensor_map::TensorMap;

mod stages;
pub use stages::{
    Decoder, Encoder, LossObject, PitchEstimator, Preprocessor, ProcessorGroup, Restorable,
};

pub mod checkpoint;

mod preprocessor;
pub use preprocessor::{hz_to_midi, DefaultPreprocessor, F0_SCALED, LD_SCALED};

mod losses;
pub use losses::{scalar, BaseModel, LossAccumulator, WaveformDistance, WaveformLoss};

pub mod pitch;
pub use pitch::{CrepeEstimator, CrepeEstimatorConfig, PitchDecoder, PitchEstimate};

mod consistency;
pub use consistency::{huber_loss, PitchConsistency, PITCH_CONSISTENCY_LOSS};

mod autoencoder;
pub use autoencoder::{Autoencoder, AutoencoderBuilder, ModelOutput};

mod registry;
pub use registry::{
    DecoderRegistry, EncoderRegistry, EstimatorRegistry, LossRegistry, ModelRegistry,
    PreprocessorRegistry, ProcessorGroupRegistry, CREPE_ESTIMATOR, DEFAULT_PREPROCESSOR,
};
