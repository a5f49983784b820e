//! Pipeline stage traits.
//!
//! An autoencoder is assembled from boxed stages:
//!
//! ```text
//! Features ─▶ Preprocessor ─▶ [Encoder] ─▶ Decoder ─▶ ProcessorGroup ─▶ audio
//!               conditioning               inputs       controls
//! ```
//!
//! Stateful stages save and load their parameters through [`Restorable`];
//! stateless ones keep the no-op defaults.

use crate::error::Result;
use crate::features::Features;
use crate::tensor_map::TensorMap;
use burn::prelude::*;
use std::path::Path;

/// Checkpoint participation.
///
/// `path` is the component's file stem inside a checkpoint directory.
/// Both methods report whether anything was written or read.
pub trait Restorable<B: Backend> {
    fn save_state(&self, _path: &Path) -> Result<bool> {
        Ok(false)
    }

    fn load_state(&mut self, _path: &Path, _device: &B::Device) -> Result<bool> {
        Ok(false)
    }
}

/// Turns raw features into conditioning.
pub trait Preprocessor<B: Backend>: Restorable<B> + Send {
    fn preprocess(&self, features: &Features<B>, training: bool) -> Result<TensorMap<B>>;
}

/// Optional learned transform of the conditioning (latents, embeddings).
pub trait Encoder<B: Backend>: Restorable<B> + Send {
    fn encode(&self, conditioning: TensorMap<B>, training: bool) -> Result<TensorMap<B>>;
}

/// Maps conditioning to processor inputs.
pub trait Decoder<B: Backend>: Restorable<B> + Send {
    fn decode(&self, conditioning: &TensorMap<B>, training: bool) -> Result<TensorMap<B>>;
}

/// Chain of differentiable signal processors.
pub trait ProcessorGroup<B: Backend>: Restorable<B> + Send {
    /// Per-processor controls from the decoder outputs.
    fn get_controls(&self, inputs: &TensorMap<B>) -> Result<TensorMap<B>>;

    /// Render `(batch, samples)` audio from controls.
    fn get_signal(&self, controls: &TensorMap<B>) -> Result<Tensor<B, 2>>;

    fn process(&self, inputs: &TensorMap<B>) -> Result<Tensor<B, 2>> {
        let controls = self.get_controls(inputs)?;
        self.get_signal(&controls)
    }
}

/// Frame-wise pitch salience from audio.
pub trait PitchEstimator<B: Backend>: Restorable<B> + Send {
    /// `(batch, samples)` audio to `(batch, frames, bins)` salience.
    fn salience(&self, audio: Tensor<B, 2>) -> Result<Tensor<B, 3>>;
}

/// A named reconstruction loss.
pub trait LossObject<B: Backend>: Send {
    fn name(&self) -> &str;

    /// Scalar loss of `audio_gen` against `audio`, shape `[1]`.
    fn loss(&self, audio: Tensor<B, 2>, audio_gen: Tensor<B, 2>) -> Result<Tensor<B, 1>>;
}
