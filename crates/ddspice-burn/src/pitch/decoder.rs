//! Soft-argmax decoding of pitch salience.

use crate::error::{Error, Result};
use burn::prelude::*;
use burn::tensor::activation::softmax;
use ddspice_core::pitch::{CENTS_OFFSET, CENTS_PER_BIN, CENTS_PER_OCTAVE, PITCH_BINS, REFERENCE_HZ};

/// Softmax sharpness used when none is configured.
pub const DEFAULT_BETA: f32 = 1e6;

/// Per-frame pitch and confidence, each `(batch, frames)`.
#[derive(Debug, Clone)]
pub struct PitchEstimate<B: Backend> {
    pub f0_hz: Tensor<B, 2>,
    pub f0_confidence: Tensor<B, 2>,
}

/// Turns `(batch, frames, 360)` salience into continuous frequency.
///
/// The bin index is a softmax-weighted average over bins, so gradients reach
/// the salience model. Larger `beta` brings the average closer to the hard
/// argmax. Confidence is the plain per-frame maximum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchDecoder {
    beta: f32,
}

impl Default for PitchDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_BETA)
    }
}

impl PitchDecoder {
    pub fn new(beta: f32) -> Self {
        Self { beta }
    }

    pub fn beta(&self) -> f32 {
        self.beta
    }

    /// Differentiable stand-in for the argmax bin index, `(batch, frames)`.
    pub fn weighted_index<B: Backend>(&self, salience: Tensor<B, 3>) -> Result<Tensor<B, 2>> {
        let [batch, frames, bins] = salience.dims();
        if bins != PITCH_BINS {
            return Err(Error::shape_mismatch("salience bins", PITCH_BINS, bins));
        }

        let device = salience.device();
        let weights = softmax(salience.mul_scalar(self.beta), 2);
        let index = Tensor::<B, 1, Int>::arange(0..PITCH_BINS as i64, &device)
            .float()
            .reshape([1, 1, PITCH_BINS])
            .expand([batch, frames, PITCH_BINS]);

        Ok(weights.mul(index).sum_dim(2).reshape([batch, frames]))
    }

    pub fn decode<B: Backend>(&self, salience: Tensor<B, 3>) -> Result<PitchEstimate<B>> {
        let [batch, frames, _] = salience.dims();
        let index = self.weighted_index(salience.clone())?;

        let cents = index.mul_scalar(CENTS_PER_BIN).add_scalar(CENTS_OFFSET);
        let f0_hz = cents
            .mul_scalar(std::f32::consts::LN_2 / CENTS_PER_OCTAVE)
            .exp()
            .mul_scalar(REFERENCE_HZ);
        let f0_confidence = salience.max_dim(2).reshape([batch, frames]);

        Ok(PitchEstimate {
            f0_hz,
            f0_confidence,
        })
    }
}
