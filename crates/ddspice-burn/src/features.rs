//! Batched feature tensors.

use crate::error::{Error, Result};
use burn::prelude::*;
use ddspice_core::features::{F0_CONFIDENCE, F0_HZ, LOUDNESS_DB, PITCH_SHIFT_STEPS, SHIFTED_AUDIO};
use ddspice_core::FeatureBatch;

/// A feature batch on a device.
///
/// Audio is `(batch, samples)`, frame features `(batch, frames)`. The
/// augmentation fields are present together or not at all.
#[derive(Debug, Clone)]
pub struct Features<B: Backend> {
    pub audio: Tensor<B, 2>,
    pub f0_hz: Tensor<B, 2>,
    pub f0_confidence: Tensor<B, 2>,
    pub loudness_db: Tensor<B, 2>,
    pub shifted_audio: Option<Tensor<B, 2>>,
    pub pitch_shift_steps: Option<Tensor<B, 1>>,
}

impl<B: Backend> Features<B> {
    pub fn new(
        audio: Tensor<B, 2>,
        f0_hz: Tensor<B, 2>,
        f0_confidence: Tensor<B, 2>,
        loudness_db: Tensor<B, 2>,
    ) -> Result<Self> {
        let [batch, _] = audio.dims();
        let [f0_batch, frames] = f0_hz.dims();
        if f0_batch != batch {
            return Err(Error::shape_mismatch(F0_HZ, batch, f0_batch));
        }
        check_dims(F0_CONFIDENCE, [batch, frames], f0_confidence.dims())?;
        check_dims(LOUDNESS_DB, [batch, frames], loudness_db.dims())?;

        Ok(Self {
            audio,
            f0_hz,
            f0_confidence,
            loudness_db,
            shifted_audio: None,
            pitch_shift_steps: None,
        })
    }

    /// Attach a shifted waveform and its per-example step counts.
    pub fn with_pitch_shift(
        mut self,
        shifted_audio: Tensor<B, 2>,
        pitch_shift_steps: Tensor<B, 1>,
    ) -> Result<Self> {
        check_dims(SHIFTED_AUDIO, self.audio.dims(), shifted_audio.dims())?;
        let [steps] = pitch_shift_steps.dims();
        if steps != self.batch_size() {
            return Err(Error::shape_mismatch(PITCH_SHIFT_STEPS, self.batch_size(), steps));
        }
        self.shifted_audio = Some(shifted_audio);
        self.pitch_shift_steps = Some(pitch_shift_steps);
        Ok(self)
    }

    /// Upload a host batch.
    pub fn from_batch(batch: &FeatureBatch, device: &B::Device) -> Result<Self> {
        let shape = batch.shape();
        let size = batch.len();
        let matrix = |values: Vec<f32>, width: usize| {
            Tensor::<B, 2>::from_data(TensorData::new(values, [size, width]), device)
        };

        let features = Self::new(
            matrix(batch.audio(), shape.audio_length),
            matrix(batch.f0_hz(), shape.feature_length),
            matrix(batch.f0_confidence(), shape.feature_length),
            matrix(batch.loudness_db(), shape.feature_length),
        )?;

        match (batch.shifted_audio(), batch.pitch_shift_steps()) {
            (Some(shifted), Some(steps)) => features.with_pitch_shift(
                matrix(shifted, shape.audio_length),
                Tensor::<B, 1>::from_data(TensorData::new(steps, [size]), device),
            ),
            _ => Ok(features),
        }
    }

    /// Derived copy with `f0_hz` and `f0_confidence` replaced.
    pub fn with_pitch(&self, f0_hz: Tensor<B, 2>, f0_confidence: Tensor<B, 2>) -> Result<Self> {
        let expected = self.loudness_db.dims();
        check_dims(F0_HZ, expected, f0_hz.dims())?;
        check_dims(F0_CONFIDENCE, expected, f0_confidence.dims())?;

        Ok(Self {
            f0_hz,
            f0_confidence,
            ..self.clone()
        })
    }

    pub fn batch_size(&self) -> usize {
        self.audio.dims()[0]
    }

    pub fn audio_length(&self) -> usize {
        self.audio.dims()[1]
    }

    pub fn feature_length(&self) -> usize {
        self.f0_hz.dims()[1]
    }

    pub fn is_augmented(&self) -> bool {
        self.shifted_audio.is_some() && self.pitch_shift_steps.is_some()
    }

    pub fn device(&self) -> B::Device {
        self.audio.device()
    }

    /// Shifted audio, required by the pitch-consistency loss.
    pub fn require_shifted_audio(&self) -> Result<Tensor<B, 2>> {
        self.shifted_audio
            .clone()
            .ok_or_else(|| Error::missing_feature(SHIFTED_AUDIO))
    }

    pub fn require_pitch_shift_steps(&self) -> Result<Tensor<B, 1>> {
        self.pitch_shift_steps
            .clone()
            .ok_or_else(|| Error::missing_feature(PITCH_SHIFT_STEPS))
    }
}

fn check_dims(field: &str, expected: [usize; 2], actual: [usize; 2]) -> Result<()> {
    for axis in 0..2 {
        if expected[axis] != actual[axis] {
            return Err(Error::shape_mismatch(field, expected[axis], actual[axis]));
        }
    }
    Ok(())
}
