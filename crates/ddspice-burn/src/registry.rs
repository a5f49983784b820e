//! Model assembly from an [`ExperimentConfig`].
//!
//! Each stage family has its own [`Registry`] keyed by the `type` name used in
//! configuration. Built-in components are registered by
//! [`ModelRegistry::default`]; decoders, processor groups and encoders are
//! supplied by the caller.
//!
//! ```ignore
//! let registry = ModelRegistry::<Backend>::default();
//! registry.decoders.register("rnn_fc", |params, device| {
//!     Ok(Box::new(RnnFcDecoder::from_params(params, device)?) as Box<dyn Decoder<_>>)
//! });
//! let model = registry.get_model(&config, &device)?;
//! ```

use crate::autoencoder::Autoencoder;
use crate::consistency::PitchConsistency;
use crate::error::{Error, Result};
use crate::losses::{WaveformDistance, WaveformLoss};
use crate::pitch::CrepeEstimatorConfig;
use crate::preprocessor::DefaultPreprocessor;
use crate::stages::{Decoder, Encoder, LossObject, PitchEstimator, Preprocessor, ProcessorGroup};
use burn::prelude::*;
use ddspice_core::{
    get_param_or, ComponentParams, ComponentSpec, ExperimentConfig, ModelKind, ParamValue,
    Registry,
};

pub const DEFAULT_PREPROCESSOR: &str = "default";
pub const CREPE_ESTIMATOR: &str = "crepe";

pub type PreprocessorRegistry<B> = Registry<Box<dyn Preprocessor<B>>, <B as Backend>::Device>;
pub type EncoderRegistry<B> = Registry<Box<dyn Encoder<B>>, <B as Backend>::Device>;
pub type DecoderRegistry<B> = Registry<Box<dyn Decoder<B>>, <B as Backend>::Device>;
pub type ProcessorGroupRegistry<B> =
    Registry<Box<dyn ProcessorGroup<B>>, <B as Backend>::Device>;
pub type LossRegistry<B> = Registry<Box<dyn LossObject<B>>, <B as Backend>::Device>;
pub type EstimatorRegistry<B> = Registry<Box<dyn PitchEstimator<B>>, <B as Backend>::Device>;

/// Constructors for every stage of an [`Autoencoder`].
#[derive(Clone)]
pub struct ModelRegistry<B: Backend> {
    pub preprocessors: PreprocessorRegistry<B>,
    pub encoders: EncoderRegistry<B>,
    pub decoders: DecoderRegistry<B>,
    pub processor_groups: ProcessorGroupRegistry<B>,
    pub losses: LossRegistry<B>,
    pub estimators: EstimatorRegistry<B>,
}

impl<B: Backend> Default for ModelRegistry<B> {
    fn default() -> Self {
        let registry = Self::empty();
        registry.register_builtins();
        registry
    }
}

impl<B: Backend> ModelRegistry<B> {
    /// Registries with nothing registered.
    pub fn empty() -> Self {
        Self {
            preprocessors: Registry::new("preprocessor"),
            encoders: Registry::new("encoder"),
            decoders: Registry::new("decoder"),
            processor_groups: Registry::new("processor_group"),
            losses: Registry::new("loss"),
            estimators: Registry::new("pitch_estimator"),
        }
    }

    fn register_builtins(&self) {
        self.preprocessors.register(DEFAULT_PREPROCESSOR, |_, _| {
            Ok(Box::new(DefaultPreprocessor) as Box<dyn Preprocessor<B>>)
        });

        for (kind, distance) in [
            ("waveform_l1", WaveformDistance::L1),
            ("waveform_l2", WaveformDistance::L2),
        ] {
            let default_name = format!("{}_loss", kind);
            self.losses.register(kind, move |params, _| {
                let name = get_param_or(params, "name", default_name.clone(), |v| {
                    v.as_str().map(str::to_string)
                })?;
                let weight = get_param_or(params, "weight", 1.0, ParamValue::as_f32)?;
                Ok(Box::new(WaveformLoss::new(name, distance).with_weight(weight))
                    as Box<dyn LossObject<B>>)
            });
        }

        self.estimators.register(CREPE_ESTIMATOR, |params, device| {
            let defaults = CrepeEstimatorConfig::new();
            let config = CrepeEstimatorConfig::new()
                .with_capacity(get_param_or(
                    params,
                    "capacity",
                    defaults.capacity,
                    ParamValue::as_usize,
                )?)
                .with_window(get_param_or(
                    params,
                    "window",
                    defaults.window,
                    ParamValue::as_usize,
                )?)
                .with_hop(get_param_or(params, "hop", defaults.hop, ParamValue::as_usize)?);
            Ok(Box::new(config.init::<B>(device)?) as Box<dyn PitchEstimator<B>>)
        });
    }

    /// Build the model described by `config`.
    ///
    /// Fails when the config has no model section, when a decoder or processor
    /// group is missing, or when a type name was never registered. The
    /// preprocessor defaults to `default`; the pitch estimator of the
    /// consistency variant to `crepe` with the data hop length.
    pub fn get_model(
        &self,
        config: &ExperimentConfig,
        device: &B::Device,
    ) -> Result<Autoencoder<B>> {
        let spec = config.model()?;
        tracing::info!("Building {:?} model", spec.kind);

        let preprocessor = match &spec.preprocessor {
            Some(component) => create(&self.preprocessors, component, device)?,
            None => self
                .preprocessors
                .create(DEFAULT_PREPROCESSOR, &ComponentParams::new(), device)?,
        };
        let decoder = spec
            .decoder
            .as_ref()
            .ok_or_else(|| Error::missing_argument("decoder"))?;
        let processor_group = spec
            .processor_group
            .as_ref()
            .ok_or_else(|| Error::missing_argument("processor_group"))?;

        let mut builder = Autoencoder::builder()
            .preprocessor(preprocessor)
            .decoder(create(&self.decoders, decoder, device)?)
            .processor_group(create(&self.processor_groups, processor_group, device)?);

        if let Some(encoder) = &spec.encoder {
            builder = builder.encoder(create(&self.encoders, encoder, device)?);
        }
        for loss in &spec.losses {
            builder = builder.loss(create(&self.losses, loss, device)?);
        }

        match spec.kind {
            ModelKind::AutoencoderDdspice => {
                let mut estimator = spec
                    .pitch_estimator
                    .clone()
                    .unwrap_or_else(|| ComponentSpec::new(CREPE_ESTIMATOR));
                if estimator.kind == CREPE_ESTIMATOR {
                    estimator
                        .params
                        .entry("hop".to_string())
                        .or_insert_with(|| ParamValue::from(config.data.hop_length()));
                }
                let estimator = create(&self.estimators, &estimator, device)?;
                builder =
                    builder.pitch_consistency(PitchConsistency::new(estimator, &spec.consistency));
            }
            ModelKind::Autoencoder => {
                if spec.pitch_estimator.is_some() {
                    tracing::warn!("pitch_estimator is ignored by a plain autoencoder");
                }
            }
        }

        let model = builder.build()?;
        tracing::info!(
            "Built model '{}' with losses {:?}",
            model.name(),
            model.loss_names()
        );
        Ok(model)
    }
}

fn create<T, Ctx>(registry: &Registry<T, Ctx>, spec: &ComponentSpec, ctx: &Ctx) -> Result<T> {
    Ok(registry.create(&spec.kind, &spec.params, ctx)?)
}
