//! Test helpers and fixtures for DDSPICE integration tests
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (copies, zero losses)
//! - `DSP_EPSILON` (1e-4): Tensor arithmetic
//! - `PERCEPTUAL_EPSILON` (0.001): Multi-stage results
//!
//! ## Stand-in stages
//!
//! Real decoders and synthesizers live outside this workspace. The
//! [`LinearDecoder`] (one trainable projection, checkpointed) and the
//! [`HoldSynth`] (sample-and-hold amplitudes) are enough to drive every
//! code path of the autoencoder.

#![allow(dead_code)]

pub mod tolerances;

use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::sigmoid;
use ddspice::core::{get_param_or, ParamValue};
use ddspice::model::checkpoint::{load_module, save_module};
use ddspice::model::{F0_SCALED, LD_SCALED};
use ddspice::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Sample rate of the default data configuration.
pub const TEST_SAMPLE_RATE: f32 = 16000.0;

/// Samples per feature frame used by the small fixtures.
pub const TEST_HOP: usize = 16;

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f32, sample_rate: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.5
        })
        .collect()
}

/// Generate white noise (random samples in -1..1), reproducible from `seed`.
pub fn generate_noise(num_samples: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_samples).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// Host copy of any tensor.
pub fn values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor
        .into_data()
        .to_vec()
        .expect("tensor data should be f32")
}

/// A sine record at `frequency` with matching pitch and loudness tracks.
pub fn sine_record(frequency: f32, frames: usize, hop: usize) -> FeatureRecord {
    FeatureRecord::new(
        generate_sine(frequency, TEST_SAMPLE_RATE, frames * hop),
        vec![frequency; frames],
        vec![1.0; frames],
        vec![-20.0; frames],
    )
}

/// Batch of sine records at the given frequencies, on `device`.
pub fn sine_features<B: Backend>(
    frequencies: &[f32],
    frames: usize,
    hop: usize,
    device: &B::Device,
) -> Features<B> {
    let records = frequencies
        .iter()
        .map(|f| sine_record(*f, frames, hop))
        .collect();
    let batch = FeatureBatch::new(records).expect("records share a shape");
    Features::from_batch(&batch, device).expect("batch uploads")
}

/// Projects `[f0_scaled, ld_scaled]` to a single amplitude per frame.
#[derive(Module, Debug)]
pub struct LinearDecoder<B: Backend> {
    projection: Linear<B>,
}

impl<B: Backend> LinearDecoder<B> {
    pub fn new(device: &B::Device) -> Self {
        Self {
            projection: LinearConfig::new(2, 1).init(device),
        }
    }

    pub fn weights(&self) -> Vec<f32> {
        values(self.projection.weight.val())
    }
}

impl<B: Backend> Decoder<B> for LinearDecoder<B> {
    fn decode(
        &self,
        conditioning: &TensorMap<B>,
        _training: bool,
    ) -> ddspice::model::Result<TensorMap<B>> {
        let inputs = Tensor::cat(
            vec![conditioning.require(F0_SCALED)?, conditioning.require(LD_SCALED)?],
            2,
        );
        let amplitudes = sigmoid(self.projection.forward(inputs));
        Ok(TensorMap::new().with("amplitudes", amplitudes))
    }
}

impl<B: Backend> Restorable<B> for LinearDecoder<B> {
    fn save_state(&self, path: &Path) -> ddspice::model::Result<bool> {
        save_module(self.clone(), path)?;
        Ok(true)
    }

    fn load_state(&mut self, path: &Path, device: &B::Device) -> ddspice::model::Result<bool> {
        match load_module(self, path, device)? {
            Some(loaded) => {
                *self = loaded;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Holds each frame's amplitude for `hop` samples.
///
/// Controls are `amplitudes` and `noise_gain` (a tenth of the amplitude).
pub struct HoldSynth {
    pub hop: usize,
}

impl<B: Backend> ProcessorGroup<B> for HoldSynth {
    fn get_controls(&self, inputs: &TensorMap<B>) -> ddspice::model::Result<TensorMap<B>> {
        let amplitudes = inputs.require("amplitudes")?;
        Ok(TensorMap::new()
            .with("amplitudes", amplitudes.clone())
            .with("noise_gain", amplitudes.mul_scalar(0.1)))
    }

    fn get_signal(&self, controls: &TensorMap<B>) -> ddspice::model::Result<Tensor<B, 2>> {
        let amplitudes = controls.require("amplitudes")?;
        let [batch, frames, _] = amplitudes.dims();
        Ok(amplitudes
            .expand([batch, frames, self.hop])
            .reshape([batch, frames * self.hop]))
    }
}

impl<B: Backend> Restorable<B> for HoldSynth {}

/// Model registry with `linear` decoders and `hold` processor groups.
pub fn test_registry<B: Backend>() -> ModelRegistry<B> {
    let registry = ModelRegistry::<B>::default();
    registry.decoders.register("linear", |_, device| {
        Ok(Box::new(LinearDecoder::<B>::new(device)) as Box<dyn Decoder<B>>)
    });
    registry.processor_groups.register("hold", |params, _| {
        let hop = get_param_or(params, "hop", TEST_HOP, ParamValue::as_usize)?;
        Ok(Box::new(HoldSynth { hop }) as Box<dyn ProcessorGroup<B>>)
    });
    registry
}

/// Plain autoencoder with an L1 and an L2 waveform loss.
pub fn test_autoencoder<B: Backend>(hop: usize, device: &B::Device) -> Autoencoder<B> {
    Autoencoder::builder()
        .preprocessor(Box::new(ddspice::DefaultPreprocessor))
        .decoder(Box::new(LinearDecoder::<B>::new(device)))
        .processor_group(Box::new(HoldSynth { hop }))
        .loss(Box::new(ddspice::WaveformLoss::l1()))
        .loss(Box::new(ddspice::WaveformLoss::l2()))
        .build()
        .expect("all stages supplied")
}
