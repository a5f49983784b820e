//! Compact trainable salience model.

use crate::checkpoint::{load_module, save_module};
use crate::error::{self, Error};
use crate::stages::{PitchEstimator, Restorable};
use burn::nn::conv::{Conv1d, Conv1dConfig};
use burn::nn::{Linear, LinearConfig, PaddingConfig1d};
use burn::prelude::*;
use burn::tensor::activation::{relu, sigmoid};
use ddspice_core::pitch::PITCH_BINS;
use std::path::Path;

#[derive(Config, Debug)]
pub struct CrepeEstimatorConfig {
    /// Filterbank channels.
    #[config(default = 32)]
    pub capacity: usize,
    /// Analysis window in samples.
    #[config(default = 1024)]
    pub window: usize,
    /// Samples per output frame.
    #[config(default = 64)]
    pub hop: usize,
}

impl CrepeEstimatorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> error::Result<CrepeEstimator<B>> {
        if self.capacity == 0 {
            return Err(Error::invalid_config("capacity must be positive"));
        }
        if self.hop == 0 || self.window < self.hop {
            return Err(Error::invalid_config(format!(
                "window ({}) must be at least hop ({}) and hop positive",
                self.window, self.hop
            )));
        }

        let filterbank = Conv1dConfig::new(1, self.capacity, self.window)
            .with_stride(self.hop)
            .with_padding(PaddingConfig1d::Explicit(self.window / 2))
            .init(device);
        let hidden = Conv1dConfig::new(self.capacity, self.capacity, 1).init(device);
        let classifier = LinearConfig::new(self.capacity, PITCH_BINS).init(device);

        Ok(CrepeEstimator {
            filterbank,
            hidden,
            classifier,
            hop: self.hop,
        })
    }
}

/// Framewise learned filterbank, a 1x1 hidden layer and a sigmoid classifier
/// over the 360 pitch bins. One frame per `hop` samples, centered.
#[derive(Module, Debug)]
pub struct CrepeEstimator<B: Backend> {
    filterbank: Conv1d<B>,
    hidden: Conv1d<B>,
    classifier: Linear<B>,
    hop: usize,
}

impl<B: Backend> CrepeEstimator<B> {
    pub fn hop(&self) -> usize {
        self.hop
    }

    /// `(batch, samples)` to `(batch, samples / hop, 360)`.
    pub fn forward(&self, audio: Tensor<B, 2>) -> Tensor<B, 3> {
        let [batch, samples] = audio.dims();
        let frames = samples / self.hop;

        let x = relu(self.filterbank.forward(audio.reshape([batch, 1, samples])));
        let x = relu(self.hidden.forward(x));
        let [_, channels, _] = x.dims();
        let x = x.slice([0..batch, 0..channels, 0..frames]).swap_dims(1, 2);

        sigmoid(self.classifier.forward(x))
    }
}

impl<B: Backend> PitchEstimator<B> for CrepeEstimator<B> {
    fn salience(&self, audio: Tensor<B, 2>) -> error::Result<Tensor<B, 3>> {
        let [_, samples] = audio.dims();
        if samples < self.hop {
            return Err(Error::shape_mismatch("audio", self.hop, samples));
        }
        Ok(self.forward(audio))
    }
}

impl<B: Backend> Restorable<B> for CrepeEstimator<B> {
    fn save_state(&self, path: &Path) -> error::Result<bool> {
        save_module(self.clone(), path)?;
        Ok(true)
    }

    fn load_state(&mut self, path: &Path, device: &B::Device) -> error::Result<bool> {
        match load_module(self, path, device)? {
            Some(loaded) => {
                *self = loaded;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
