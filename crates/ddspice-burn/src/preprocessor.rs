//! Default conditioning: pitch and loudness scaled into roughly `[0, 1]`.

use crate::error::Result;
use crate::features::Features;
use crate::stages::{Preprocessor, Restorable};
use crate::tensor_map::TensorMap;
use burn::prelude::*;
use ddspice_core::features::{F0_HZ, LOUDNESS_DB};
use ddspice_core::pitch::{LOUDNESS_RANGE_DB, MIDI_RANGE};

pub const F0_SCALED: &str = "f0_scaled";
pub const LD_SCALED: &str = "ld_scaled";

/// Emits `f0_hz`, `loudness_db`, `f0_scaled` and `ld_scaled`, each
/// `(batch, frames, 1)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPreprocessor;

impl DefaultPreprocessor {
    pub fn new() -> Self {
        Self
    }
}

/// MIDI note numbers, clamped at 0 for silence and sub-audio frequencies.
///
/// Tensor form of [`ddspice_core::pitch::hz_to_midi`].
pub fn hz_to_midi<B: Backend, const D: usize>(f0_hz: Tensor<B, D>) -> Tensor<B, D> {
    let log2_hz = f0_hz.clamp_min(1e-5).log().div_scalar(std::f32::consts::LN_2);
    log2_hz
        .sub_scalar(440.0_f32.log2())
        .mul_scalar(12.0)
        .add_scalar(69.0)
        .clamp_min(0.0)
}

impl<B: Backend> Preprocessor<B> for DefaultPreprocessor {
    fn preprocess(&self, features: &Features<B>, _training: bool) -> Result<TensorMap<B>> {
        let [batch, frames] = features.f0_hz.dims();
        let column = |tensor: Tensor<B, 2>| tensor.reshape([batch, frames, 1]);

        let f0_scaled = hz_to_midi(features.f0_hz.clone()).div_scalar(MIDI_RANGE);
        let ld_scaled = features
            .loudness_db
            .clone()
            .div_scalar(LOUDNESS_RANGE_DB)
            .add_scalar(1.0);

        Ok(TensorMap::new()
            .with(F0_HZ, column(features.f0_hz.clone()))
            .with(LOUDNESS_DB, column(features.loudness_db.clone()))
            .with(F0_SCALED, column(f0_scaled))
            .with(LD_SCALED, column(ld_scaled)))
    }
}

impl<B: Backend> Restorable<B> for DefaultPreprocessor {}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::backend::NdArray;
    use ddspice_core::pitch;

    type TestBackend = NdArray<f32>;

    fn values(map: &TensorMap<TestBackend>, key: &str) -> Vec<f32> {
        map.get(key).unwrap().clone().into_data().to_vec().unwrap()
    }

    #[test]
    fn test_hz_to_midi_matches_scalar() {
        let device = NdArrayDevice::default();
        let hz = [0.0, 1.0, 220.0, 440.0, 1000.0];
        let tensor = Tensor::<TestBackend, 1>::from_floats(hz, &device);
        let midi: Vec<f32> = hz_to_midi(tensor).into_data().to_vec().unwrap();

        for (value, expected) in midi.iter().zip(hz.iter().map(|h| pitch::hz_to_midi(*h))) {
            assert_relative_eq!(*value, expected, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_preprocess_scaling() {
        let device = NdArrayDevice::default();
        let features = Features::<TestBackend>::new(
            Tensor::zeros([2, 64], &device),
            Tensor::full([2, 4], 440.0, &device),
            Tensor::ones([2, 4], &device),
            Tensor::full([2, 4], -60.0, &device),
        )
        .unwrap();

        let conditioning = DefaultPreprocessor.preprocess(&features, true).unwrap();
        assert_eq!(
            conditioning.keys().collect::<Vec<_>>(),
            vec![F0_HZ, LOUDNESS_DB, F0_SCALED, LD_SCALED]
        );
        assert_eq!(conditioning.get(F0_SCALED).unwrap().dims(), [2, 4, 1]);

        for v in values(&conditioning, F0_SCALED) {
            assert_relative_eq!(v, 69.0 / 127.0, epsilon = 1e-4);
        }
        for v in values(&conditioning, LD_SCALED) {
            assert_relative_eq!(v, 0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_silent_pitch_scales_to_zero() {
        let device = NdArrayDevice::default();
        let features = Features::<TestBackend>::new(
            Tensor::zeros([1, 16], &device),
            Tensor::zeros([1, 2], &device),
            Tensor::zeros([1, 2], &device),
            Tensor::zeros([1, 2], &device),
        )
        .unwrap();

        let conditioning = DefaultPreprocessor.preprocess(&features, false).unwrap();
        assert_eq!(values(&conditioning, F0_SCALED), vec![0.0, 0.0]);
        assert_eq!(values(&conditioning, LD_SCALED), vec![1.0, 1.0]);
    }
}
