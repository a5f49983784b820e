//! Pitch-consistency objective for the embedded pitch estimator.
//!
//! The estimator runs on the original and the pitch-shifted waveform. The
//! change in estimated pitch between the two is pushed towards the applied
//! shift with a Huber loss.

use crate::error::{Error, Result};
use crate::pitch::{PitchDecoder, PitchEstimate};
use crate::stages::PitchEstimator;
use burn::prelude::*;
use ddspice_core::features::F0_HZ;
use ddspice_core::{ConsistencyConfig, ConsistencyTarget};

/// Loss name recorded by the consistency variant.
pub const PITCH_CONSISTENCY_LOSS: &str = "pitch_consistency_loss";

/// Mean Huber loss: quadratic below `delta`, linear above.
pub fn huber_loss<B: Backend, const D: usize>(
    prediction: Tensor<B, D>,
    target: Tensor<B, D>,
    delta: f32,
) -> Tensor<B, 1> {
    let residual = prediction.sub(target).abs();
    let quadratic = residual.clone().powf_scalar(2.0).mul_scalar(0.5);
    let linear = residual.clone().sub_scalar(0.5 * delta).mul_scalar(delta);
    quadratic
        .mask_where(residual.greater_elem(delta), linear)
        .mean()
}

pub struct PitchConsistency<B: Backend> {
    estimator: Box<dyn PitchEstimator<B>>,
    decoder: PitchDecoder,
    huber_delta: f32,
    target: ConsistencyTarget,
}

impl<B: Backend> PitchConsistency<B> {
    pub fn new(estimator: Box<dyn PitchEstimator<B>>, config: &ConsistencyConfig) -> Self {
        Self {
            estimator,
            decoder: PitchDecoder::new(config.beta),
            huber_delta: config.huber_delta,
            target: config.target,
        }
    }

    pub fn decoder(&self) -> &PitchDecoder {
        &self.decoder
    }

    pub fn target(&self) -> ConsistencyTarget {
        self.target
    }

    pub fn estimator(&self) -> &dyn PitchEstimator<B> {
        self.estimator.as_ref()
    }

    pub fn estimator_mut(&mut self) -> &mut dyn PitchEstimator<B> {
        self.estimator.as_mut()
    }

    /// Salience model followed by soft-argmax decoding.
    pub fn estimate(&self, audio: Tensor<B, 2>) -> Result<PitchEstimate<B>> {
        let salience = self.estimator.salience(audio)?;
        self.decoder.decode(salience)
    }

    /// Compare per-example `steps` against the observed pitch change per frame.
    pub fn loss(
        &self,
        f0_hz: Tensor<B, 2>,
        f0_hz_shift: Tensor<B, 2>,
        steps: Tensor<B, 1>,
    ) -> Result<Tensor<B, 1>> {
        let [batch, frames] = f0_hz.dims();
        let [shift_batch, shift_frames] = f0_hz_shift.dims();
        if shift_batch != batch {
            return Err(Error::shape_mismatch(F0_HZ, batch, shift_batch));
        }
        if shift_frames != frames {
            return Err(Error::shape_mismatch(F0_HZ, frames, shift_frames));
        }
        let [step_batch] = steps.dims();
        if step_batch != batch {
            return Err(Error::shape_mismatch("pitch_shift_steps", batch, step_batch));
        }

        let observed = match self.target {
            ConsistencyTarget::HzDelta => f0_hz_shift.sub(f0_hz),
            ConsistencyTarget::SemitoneDelta => {
                let ratio = f0_hz_shift
                    .clamp_min(1e-5)
                    .log()
                    .sub(f0_hz.clamp_min(1e-5).log());
                ratio.mul_scalar(12.0 / std::f32::consts::LN_2)
            }
        };
        let target = steps.reshape([batch, 1]).expand([batch, frames]);

        Ok(huber_loss(observed, target, self.huber_delta))
    }
}
