//! Experiment configuration.
//!
//! Plain structs loaded once from TOML at process start. Component sections
//! name a registered type plus free-form parameters; the model crate turns
//! them into instances through its registry.
//!
//! ```toml
//! [data]
//! example_secs = 4
//!
//! [model]
//! type = "autoencoder_ddspice"
//! preprocessor = { type = "default" }
//! decoder = { type = "rnn_fc", hidden = 512 }
//! processor_group = { type = "additive_noise" }
//! losses = [{ type = "waveform_l1" }]
//!
//! [model.consistency]
//! target = "semitone_delta"
//! ```

use crate::error::{Error, Result};
use crate::registry::ComponentParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fixed-length example layout shared by providers and models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub example_secs: u32,
    pub sample_rate: u32,
    pub frame_rate: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            example_secs: 4,
            sample_rate: 16000,
            frame_rate: 250,
        }
    }
}

impl DataConfig {
    /// Samples per example (`L_a`).
    pub fn audio_length(&self) -> usize {
        (self.example_secs * self.sample_rate) as usize
    }

    /// Frames per example (`L_f`).
    pub fn feature_length(&self) -> usize {
        (self.example_secs * self.frame_rate) as usize
    }

    /// Samples per analysis frame.
    pub fn hop_length(&self) -> usize {
        (self.sample_rate / self.frame_rate.max(1)) as usize
    }

    pub fn validate(&self) -> Result<()> {
        if self.example_secs == 0 {
            return Err(Error::InvalidConfig("example_secs must be positive".into()));
        }
        if self.sample_rate < 8000 || self.sample_rate > 384000 {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if self.frame_rate == 0 || self.sample_rate % self.frame_rate != 0 {
            return Err(Error::InvalidConfig(format!(
                "frame_rate {} must divide sample_rate {}",
                self.frame_rate, self.sample_rate
            )));
        }
        Ok(())
    }
}

/// Resampling kernel presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleQuality {
    /// Short kernel, the augmentation default.
    #[default]
    Fast,
    Medium,
    High,
    Best,
}

/// Pitch-shift augmentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    /// Shifts are drawn uniformly from `[-max_shift_steps, max_shift_steps]`.
    pub max_shift_steps: u32,
    pub bins_per_octave: u32,
    pub quality: ResampleQuality,
    /// Seed for per-example shift sampling. `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            max_shift_steps: 12,
            bins_per_octave: 12,
            quality: ResampleQuality::Fast,
            seed: None,
        }
    }
}

impl AugmentConfig {
    /// Largest shift magnitude the augmenter accepts: two octaves.
    pub fn shift_limit(&self) -> u32 {
        2 * self.bins_per_octave
    }

    pub fn validate(&self) -> Result<()> {
        if self.bins_per_octave == 0 {
            return Err(Error::InvalidConfig("bins_per_octave must be positive".into()));
        }
        if self.max_shift_steps > self.shift_limit() {
            return Err(Error::InvalidConfig(format!(
                "max_shift_steps {} exceeds two octaves",
                self.max_shift_steps
            )));
        }
        Ok(())
    }
}

/// What the pitch-consistency loss compares the applied shift against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyTarget {
    /// Raw semitone count against `f0_shift - f0` in Hz.
    #[default]
    HzDelta,
    /// Semitone count against `12 * log2(f0_shift / f0)`.
    SemitoneDelta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyConfig {
    pub target: ConsistencyTarget,
    /// Huber transition point.
    pub huber_delta: f32,
    /// Soft-argmax sharpness.
    pub beta: f32,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            target: ConsistencyTarget::HzDelta,
            huber_delta: 1.0,
            beta: 1e6,
        }
    }
}

/// A registered component type plus its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub params: ComponentParams,
}

impl ComponentSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: ComponentParams::new(),
        }
    }

    pub fn with_params(mut self, params: ComponentParams) -> Self {
        self.params = params;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    Autoencoder,
    /// Autoencoder with embedded pitch estimation and the consistency loss.
    AutoencoderDdspice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    #[serde(rename = "type", default)]
    pub kind: ModelKind,
    #[serde(default)]
    pub preprocessor: Option<ComponentSpec>,
    #[serde(default)]
    pub encoder: Option<ComponentSpec>,
    #[serde(default)]
    pub decoder: Option<ComponentSpec>,
    #[serde(default)]
    pub processor_group: Option<ComponentSpec>,
    #[serde(default)]
    pub losses: Vec<ComponentSpec>,
    #[serde(default)]
    pub pitch_estimator: Option<ComponentSpec>,
    #[serde(default)]
    pub consistency: ConsistencyConfig,
}

impl ModelSpec {
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            preprocessor: None,
            encoder: None,
            decoder: None,
            processor_group: None,
            losses: Vec::new(),
            pitch_estimator: None,
            consistency: ConsistencyConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.consistency.huber_delta <= 0.0 {
            return Err(Error::InvalidConfig("huber_delta must be positive".into()));
        }
        if self.consistency.beta <= 0.0 {
            return Err(Error::InvalidConfig("beta must be positive".into()));
        }
        Ok(())
    }
}

/// Top-level configuration for one training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub augmentation: AugmentConfig,
    #[serde(default)]
    pub model: Option<ModelSpec>,
}

impl ExperimentConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        tracing::info!("Loaded experiment config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.data.validate()?;
        self.augmentation.validate()?;
        if let Some(model) = &self.model {
            model.validate()?;
        }
        Ok(())
    }

    /// The model section, required by anything that builds a model.
    pub fn model(&self) -> Result<&ModelSpec> {
        self.model
            .as_ref()
            .ok_or_else(|| Error::MissingArgument("model".into()))
    }
}
