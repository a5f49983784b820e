//! Autoencoder composition: features to conditioning to audio.
//!
//! One type covers both variants. With a [`PitchConsistency`] attached, pitch
//! is estimated from the audio instead of taken from the features, and every
//! call also estimates pitch on the shifted audio and records
//! `pitch_consistency_loss`.

use crate::checkpoint::{checkpoint_dir, latest_checkpoint};
use crate::consistency::{PitchConsistency, PITCH_CONSISTENCY_LOSS};
use crate::error::{Error, Result};
use crate::features::Features;
use crate::losses::{BaseModel, LossAccumulator};
use crate::stages::{Decoder, Encoder, LossObject, Preprocessor, ProcessorGroup, Restorable};
use crate::tensor_map::TensorMap;
use burn::prelude::*;
use ddspice_core::LossReport;
use std::path::{Path, PathBuf};
use std::time::Instant;

const PREPROCESSOR_STEM: &str = "preprocessor";
const ENCODER_STEM: &str = "encoder";
const DECODER_STEM: &str = "decoder";
const PROCESSOR_GROUP_STEM: &str = "processor_group";
const PITCH_ESTIMATOR_STEM: &str = "pitch_estimator";

/// Generated audio and the losses recorded while producing it.
#[derive(Debug, Clone)]
pub struct ModelOutput<B: Backend> {
    pub audio: Tensor<B, 2>,
    pub losses: LossAccumulator<B>,
}

pub struct Autoencoder<B: Backend> {
    base: BaseModel<B>,
    preprocessor: Box<dyn Preprocessor<B>>,
    encoder: Option<Box<dyn Encoder<B>>>,
    decoder: Box<dyn Decoder<B>>,
    processor_group: Box<dyn ProcessorGroup<B>>,
    consistency: Option<PitchConsistency<B>>,
}

impl<B: Backend> Autoencoder<B> {
    pub fn builder() -> AutoencoderBuilder<B> {
        AutoencoderBuilder::default()
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    /// Whether pitch is estimated internally and the consistency loss recorded.
    pub fn is_consistent(&self) -> bool {
        self.consistency.is_some()
    }

    pub fn consistency(&self) -> Option<&PitchConsistency<B>> {
        self.consistency.as_ref()
    }

    pub fn loss_names(&self) -> Vec<String> {
        self.base.loss_names()
    }

    /// Preprocessor, then the encoder if any.
    ///
    /// The consistency variant first replaces `f0_hz` and `f0_confidence` with
    /// estimates from `features.audio`, in a copy.
    pub fn encode(&self, features: &Features<B>, training: bool) -> Result<TensorMap<B>> {
        self.encode_with_pitch(features, training)
            .map(|(conditioning, _)| conditioning)
    }

    /// Also returns the estimated `f0_hz` for the consistency variant.
    fn encode_with_pitch(
        &self,
        features: &Features<B>,
        training: bool,
    ) -> Result<(TensorMap<B>, Option<Tensor<B, 2>>)> {
        let (conditioning, f0_hz) = match &self.consistency {
            Some(consistency) => {
                let estimate = consistency.estimate(features.audio.clone())?;
                let f0_hz = estimate.f0_hz.clone();
                let features = features.with_pitch(estimate.f0_hz, estimate.f0_confidence)?;
                (self.preprocessor.preprocess(&features, training)?, Some(f0_hz))
            }
            None => (self.preprocessor.preprocess(features, training)?, None),
        };

        let conditioning = match &self.encoder {
            Some(encoder) => encoder.encode(conditioning, training)?,
            None => conditioning,
        };
        Ok((conditioning, f0_hz))
    }

    /// Decoder, then the processor group.
    pub fn decode(&self, conditioning: &TensorMap<B>, training: bool) -> Result<Tensor<B, 2>> {
        let inputs = self.decoder.decode(conditioning, training)?;
        self.processor_group.process(&inputs)
    }

    /// Full forward pass.
    ///
    /// Reconstruction losses are recorded only when `training`. The
    /// consistency loss is recorded on every call of the consistency variant,
    /// which therefore needs `shifted_audio` and `pitch_shift_steps`.
    pub fn call(&self, features: &Features<B>, training: bool) -> Result<ModelOutput<B>> {
        let shift = match &self.consistency {
            Some(_) => Some((
                features.require_shifted_audio()?,
                features.require_pitch_shift_steps()?,
            )),
            None => None,
        };

        let (conditioning, f0_hz) = self.encode_with_pitch(features, training)?;
        let audio = self.decode(&conditioning, training)?;

        let mut losses = LossAccumulator::new();
        if training {
            self.base
                .add_losses(&mut losses, features.audio.clone(), audio.clone())?;
        }

        if let (Some(consistency), Some((shifted_audio, steps)), Some(f0_hz)) =
            (&self.consistency, shift, f0_hz)
        {
            let shifted = consistency.estimate(shifted_audio)?;
            let loss = consistency.loss(f0_hz, shifted.f0_hz, steps)?;
            losses.add(PITCH_CONSISTENCY_LOSS, loss);
        }

        tracing::trace!("{} recorded {} losses", self.name(), losses.len());
        Ok(ModelOutput { audio, losses })
    }

    /// Processor controls for `features`, optionally only `keys`.
    pub fn get_controls(
        &self,
        features: &Features<B>,
        keys: Option<&[&str]>,
        training: bool,
    ) -> Result<TensorMap<B>> {
        let conditioning = self.encode(features, training)?;
        let inputs = self.decoder.decode(&conditioning, training)?;
        let controls = self.processor_group.get_controls(&inputs)?;
        match keys {
            Some(keys) => controls.select(keys),
            None => Ok(controls),
        }
    }

    /// Scalar report of `losses` with `total_loss`.
    pub fn losses_dict(&self, losses: &LossAccumulator<B>) -> Result<LossReport> {
        self.base.losses_dict(losses)
    }

    /// Load the newest checkpoint under `path`.
    ///
    /// Components without a record keep their current parameters, as do
    /// components whose record fails to load. Returns the checkpoint used, or
    /// `None` if there was none.
    pub fn restore(&mut self, path: &Path, device: &B::Device) -> Result<Option<PathBuf>> {
        let start = Instant::now();
        let Some(checkpoint) = latest_checkpoint(path)? else {
            tracing::info!(
                "Could not find checkpoint to load at {}, skipping.",
                path.display()
            );
            return Ok(None);
        };

        load_component::<B, _>(
            self.preprocessor.as_mut(),
            &checkpoint,
            PREPROCESSOR_STEM,
            device,
        );
        if let Some(encoder) = self.encoder.as_mut() {
            load_component::<B, _>(encoder.as_mut(), &checkpoint, ENCODER_STEM, device);
        }
        load_component::<B, _>(self.decoder.as_mut(), &checkpoint, DECODER_STEM, device);
        load_component::<B, _>(
            self.processor_group.as_mut(),
            &checkpoint,
            PROCESSOR_GROUP_STEM,
            device,
        );
        if let Some(consistency) = self.consistency.as_mut() {
            load_component::<B, _>(
                consistency.estimator_mut(),
                &checkpoint,
                PITCH_ESTIMATOR_STEM,
                device,
            );
        }

        tracing::info!("Loaded checkpoint {}", checkpoint.display());
        tracing::info!(
            "Loading model took {:.1} seconds",
            start.elapsed().as_secs_f64()
        );
        Ok(Some(checkpoint))
    }

    /// Write every stateful component to `<dir>/ckpt-<step>/`.
    pub fn save(&self, dir: &Path, step: u64) -> Result<PathBuf> {
        let checkpoint = checkpoint_dir(dir, step);
        std::fs::create_dir_all(&checkpoint)?;

        self.preprocessor
            .save_state(&checkpoint.join(PREPROCESSOR_STEM))?;
        if let Some(encoder) = &self.encoder {
            encoder.save_state(&checkpoint.join(ENCODER_STEM))?;
        }
        self.decoder.save_state(&checkpoint.join(DECODER_STEM))?;
        self.processor_group
            .save_state(&checkpoint.join(PROCESSOR_GROUP_STEM))?;
        if let Some(consistency) = &self.consistency {
            consistency
                .estimator()
                .save_state(&checkpoint.join(PITCH_ESTIMATOR_STEM))?;
        }

        tracing::info!("Saved checkpoint {}", checkpoint.display());
        Ok(checkpoint)
    }
}

fn load_component<B: Backend, R: Restorable<B> + ?Sized>(
    component: &mut R,
    checkpoint: &Path,
    stem: &str,
    device: &B::Device,
) {
    match component.load_state(&checkpoint.join(stem), device) {
        Ok(true) => tracing::debug!("Restored {}", stem),
        Ok(false) => tracing::debug!("No {} state in {}", stem, checkpoint.display()),
        Err(e) => tracing::warn!("Skipping {} from {}: {}", stem, checkpoint.display(), e),
    }
}

/// Assembles an [`Autoencoder`]. Preprocessor, decoder and processor group
/// are required.
pub struct AutoencoderBuilder<B: Backend> {
    name: Option<String>,
    preprocessor: Option<Box<dyn Preprocessor<B>>>,
    encoder: Option<Box<dyn Encoder<B>>>,
    decoder: Option<Box<dyn Decoder<B>>>,
    processor_group: Option<Box<dyn ProcessorGroup<B>>>,
    losses: Vec<Box<dyn LossObject<B>>>,
    consistency: Option<PitchConsistency<B>>,
}

impl<B: Backend> Default for AutoencoderBuilder<B> {
    fn default() -> Self {
        Self {
            name: None,
            preprocessor: None,
            encoder: None,
            decoder: None,
            processor_group: None,
            losses: Vec::new(),
            consistency: None,
        }
    }
}

impl<B: Backend> AutoencoderBuilder<B> {
    /// Default: `autoencoder`, or `autoencoder_ddspice` with pitch consistency
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn preprocessor(mut self, preprocessor: Box<dyn Preprocessor<B>>) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    pub fn encoder(mut self, encoder: Box<dyn Encoder<B>>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn decoder(mut self, decoder: Box<dyn Decoder<B>>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn processor_group(mut self, processor_group: Box<dyn ProcessorGroup<B>>) -> Self {
        self.processor_group = Some(processor_group);
        self
    }

    /// Losses are evaluated in the order they are added.
    pub fn loss(mut self, loss: Box<dyn LossObject<B>>) -> Self {
        self.losses.push(loss);
        self
    }

    pub fn losses(mut self, losses: impl IntoIterator<Item = Box<dyn LossObject<B>>>) -> Self {
        self.losses.extend(losses);
        self
    }

    pub fn pitch_consistency(mut self, consistency: PitchConsistency<B>) -> Self {
        self.consistency = Some(consistency);
        self
    }

    pub fn build(self) -> Result<Autoencoder<B>> {
        let preprocessor = self
            .preprocessor
            .ok_or_else(|| Error::missing_argument("preprocessor"))?;
        let decoder = self
            .decoder
            .ok_or_else(|| Error::missing_argument("decoder"))?;
        let processor_group = self
            .processor_group
            .ok_or_else(|| Error::missing_argument("processor_group"))?;

        let (default_name, extra_losses) = match self.consistency {
            Some(_) => ("autoencoder_ddspice", vec![PITCH_CONSISTENCY_LOSS.to_string()]),
            None => ("autoencoder", Vec::new()),
        };
        let name = self.name.unwrap_or_else(|| default_name.to_string());
        let base = BaseModel::new(name, self.losses, extra_losses)?;

        tracing::debug!(
            "Built {} with {} loss objects",
            base.name(),
            base.loss_names().len() - 1
        );

        Ok(Autoencoder {
            base,
            preprocessor,
            encoder: self.encoder,
            decoder,
            processor_group,
            consistency: self.consistency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::losses::{scalar, WaveformLoss};
    use crate::pitch::CrepeEstimatorConfig;
    use crate::preprocessor::{DefaultPreprocessor, F0_SCALED};
    use approx::assert_relative_eq;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::backend::NdArray;
    use ddspice_core::{ConsistencyConfig, TOTAL_LOSS};

    type TestBackend = NdArray<f32>;

    /// Passes `f0_scaled` through as `amplitudes`.
    struct PassDecoder;

    impl Restorable<TestBackend> for PassDecoder {}

    impl Decoder<TestBackend> for PassDecoder {
        fn decode(
            &self,
            conditioning: &TensorMap<TestBackend>,
            _training: bool,
        ) -> Result<TensorMap<TestBackend>> {
            Ok(TensorMap::new().with("amplitudes", conditioning.require(F0_SCALED)?))
        }
    }

    /// Holds each frame's amplitude for `hop` samples.
    struct HoldGroup {
        hop: usize,
    }

    impl Restorable<TestBackend> for HoldGroup {}

    impl ProcessorGroup<TestBackend> for HoldGroup {
        fn get_controls(
            &self,
            inputs: &TensorMap<TestBackend>,
        ) -> Result<TensorMap<TestBackend>> {
            let amplitudes = inputs.require("amplitudes")?;
            Ok(TensorMap::new()
                .with("amplitudes", amplitudes.clone())
                .with("gain", amplitudes.mul_scalar(0.5)))
        }

        fn get_signal(&self, controls: &TensorMap<TestBackend>) -> Result<Tensor<TestBackend, 2>> {
            let amplitudes = controls.require("amplitudes")?;
            let [batch, frames, _] = amplitudes.dims();
            Ok(amplitudes
                .expand([batch, frames, self.hop])
                .reshape([batch, frames * self.hop]))
        }
    }

    fn features(batch: usize, frames: usize, hop: usize) -> Features<TestBackend> {
        let device = NdArrayDevice::default();
        Features::new(
            Tensor::zeros([batch, frames * hop], &device),
            Tensor::full([batch, frames], 440.0, &device),
            Tensor::ones([batch, frames], &device),
            Tensor::full([batch, frames], -30.0, &device),
        )
        .unwrap()
    }

    fn autoencoder(hop: usize) -> Autoencoder<TestBackend> {
        Autoencoder::builder()
            .preprocessor(Box::new(DefaultPreprocessor))
            .decoder(Box::new(PassDecoder))
            .processor_group(Box::new(HoldGroup { hop }))
            .loss(Box::new(WaveformLoss::l1()))
            .build()
            .unwrap()
    }

    fn ddspice(hop: usize) -> Autoencoder<TestBackend> {
        let device = NdArrayDevice::default();
        let estimator = CrepeEstimatorConfig::new()
            .with_capacity(2)
            .with_window(2 * hop)
            .with_hop(hop)
            .init::<TestBackend>(&device)
            .unwrap();
        Autoencoder::builder()
            .preprocessor(Box::new(DefaultPreprocessor))
            .decoder(Box::new(PassDecoder))
            .processor_group(Box::new(HoldGroup { hop }))
            .loss(Box::new(WaveformLoss::l1()))
            .pitch_consistency(PitchConsistency::new(
                Box::new(estimator),
                &ConsistencyConfig::default(),
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_stages() {
        let result = Autoencoder::<TestBackend>::builder()
            .preprocessor(Box::new(DefaultPreprocessor))
            .processor_group(Box::new(HoldGroup { hop: 4 }))
            .build();
        assert!(matches!(
            result,
            Err(Error::Core(ddspice_core::Error::MissingArgument(arg))) if arg == "decoder"
        ));
    }

    #[test]
    fn test_default_names() {
        assert_eq!(autoencoder(4).name(), "autoencoder");
        assert_eq!(ddspice(4).name(), "autoencoder_ddspice");
        assert_eq!(
            ddspice(4).loss_names(),
            vec!["waveform_l1_loss", PITCH_CONSISTENCY_LOSS, TOTAL_LOSS]
        );
    }

    #[test]
    fn test_call_training_records_losses() {
        let model = autoencoder(4);
        let output = model.call(&features(2, 3, 4), true).unwrap();
        assert_eq!(output.audio.dims(), [2, 12]);

        // audio is silent, generated is 69/127 everywhere
        let report = model.losses_dict(&output.losses).unwrap();
        assert_relative_eq!(
            report.get("waveform_l1_loss").unwrap(),
            69.0 / 127.0,
            epsilon = 1e-4
        );
        assert_relative_eq!(report.total(), report.get("waveform_l1_loss").unwrap());
    }

    #[test]
    fn test_call_inference_records_nothing() {
        let model = autoencoder(4);
        let output = model.call(&features(1, 2, 4), false).unwrap();
        assert!(output.losses.is_empty());

        let report = model.losses_dict(&output.losses).unwrap();
        assert_eq!(report.get("waveform_l1_loss"), Some(0.0));
        assert_eq!(report.total(), 0.0);
    }

    #[test]
    fn test_get_controls_filter() {
        let model = autoencoder(4);
        let features = features(1, 2, 4);

        let all = model.get_controls(&features, None, false).unwrap();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["amplitudes", "gain"]);

        let gain = model.get_controls(&features, Some(&["gain"]), false).unwrap();
        assert_eq!(gain.keys().collect::<Vec<_>>(), vec!["gain"]);

        let expected: Vec<f32> = all.get("gain").unwrap().clone().into_data().to_vec().unwrap();
        let actual: Vec<f32> = gain.get("gain").unwrap().clone().into_data().to_vec().unwrap();
        assert_eq!(expected, actual);

        assert!(model
            .get_controls(&features, Some(&["reverb"]), false)
            .is_err());
    }

    #[test]
    fn test_ddspice_requires_shift() {
        let model = ddspice(4);
        assert!(matches!(
            model.call(&features(1, 2, 4), true),
            Err(Error::Core(ddspice_core::Error::MissingFeature(_)))
        ));
    }

    #[test]
    fn test_ddspice_encode_does_not_touch_features() {
        let model = ddspice(4);
        let features = features(1, 3, 4);
        let conditioning = model.encode(&features, false).unwrap();

        assert!(conditioning.contains(F0_SCALED));
        let f0: Vec<f32> = features.f0_hz.clone().into_data().to_vec().unwrap();
        assert!(f0.iter().all(|hz| *hz == 440.0));
    }

    #[test]
    fn test_ddspice_zero_shift_loss() {
        let device = NdArrayDevice::default();
        let model = ddspice(4);
        let features = features(2, 3, 4);
        let shifted = features.audio.clone();
        let features = features
            .with_pitch_shift(shifted, Tensor::zeros([2], &device))
            .unwrap();

        let output = model.call(&features, false).unwrap();
        let loss = scalar(output.losses.get(PITCH_CONSISTENCY_LOSS).unwrap().clone()).unwrap();
        assert_relative_eq!(loss, 0.0, epsilon = 1e-6);
        assert!(output.losses.get("waveform_l1_loss").is_none());
    }

    #[test]
    fn test_restore_missing_checkpoint() {
        let device = NdArrayDevice::default();
        let dir = tempfile::tempdir().unwrap();
        let mut model = ddspice(4);
        assert!(model.restore(dir.path(), &device).unwrap().is_none());
    }
}
