//! Loss objects, the per-call loss accumulator and loss bookkeeping.

use crate::error::{Error, Result};
use crate::stages::LossObject;
use burn::prelude::*;
use ddspice_core::features::AUDIO;
use ddspice_core::{LossReport, TOTAL_LOSS};

/// Read a one-element tensor back to the host.
pub fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> Result<f32> {
    let values: Vec<f32> = tensor
        .into_data()
        .to_vec()
        .map_err(|e| Error::TensorData(format!("{:?}", e)))?;
    values
        .first()
        .copied()
        .ok_or_else(|| Error::TensorData("empty loss tensor".into()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveformDistance {
    L1,
    L2,
}

/// Mean absolute or squared sample error between real and generated audio.
#[derive(Debug, Clone)]
pub struct WaveformLoss {
    name: String,
    distance: WaveformDistance,
    weight: f32,
}

impl WaveformLoss {
    pub fn new(name: impl Into<String>, distance: WaveformDistance) -> Self {
        Self {
            name: name.into(),
            distance,
            weight: 1.0,
        }
    }

    pub fn l1() -> Self {
        Self::new("waveform_l1_loss", WaveformDistance::L1)
    }

    pub fn l2() -> Self {
        Self::new("waveform_l2_loss", WaveformDistance::L2)
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }
}

impl<B: Backend> LossObject<B> for WaveformLoss {
    fn name(&self) -> &str {
        &self.name
    }

    fn loss(&self, audio: Tensor<B, 2>, audio_gen: Tensor<B, 2>) -> Result<Tensor<B, 1>> {
        let [batch, samples] = audio.dims();
        let [gen_batch, gen_samples] = audio_gen.dims();
        if gen_batch != batch {
            return Err(Error::shape_mismatch(AUDIO, batch, gen_batch));
        }
        if gen_samples != samples {
            return Err(Error::shape_mismatch(AUDIO, samples, gen_samples));
        }

        let diff = audio.sub(audio_gen);
        let distance = match self.distance {
            WaveformDistance::L1 => diff.abs(),
            WaveformDistance::L2 => diff.powf_scalar(2.0),
        };
        Ok(distance.mean().mul_scalar(self.weight))
    }
}

/// Losses recorded during one forward pass, in recording order.
#[derive(Debug, Clone)]
pub struct LossAccumulator<B: Backend> {
    entries: Vec<(String, Tensor<B, 1>)>,
}

impl<B: Backend> Default for LossAccumulator<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> LossAccumulator<B> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record `loss` under `name`, adding to any earlier value of that name.
    pub fn add(&mut self, name: impl Into<String>, loss: Tensor<B, 1>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, value)) => *value = value.clone().add(loss),
            None => self.entries.push((name, loss)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Tensor<B, 1>> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, loss)| loss)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor<B, 1>)> {
        self.entries.iter().map(|(name, loss)| (name.as_str(), loss))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of every recorded loss, for backpropagation. `None` if empty.
    pub fn total(&self) -> Option<Tensor<B, 1>> {
        self.entries
            .iter()
            .map(|(_, loss)| loss.clone())
            .reduce(|acc, loss| acc.add(loss))
    }
}

/// Named loss objects plus any extra losses a model records itself.
pub struct BaseModel<B: Backend> {
    name: String,
    loss_objects: Vec<Box<dyn LossObject<B>>>,
    extra_losses: Vec<String>,
}

impl<B: Backend> BaseModel<B> {
    /// Loss names must be unique and may not shadow `total_loss`.
    pub fn new(
        name: impl Into<String>,
        loss_objects: Vec<Box<dyn LossObject<B>>>,
        extra_losses: Vec<String>,
    ) -> Result<Self> {
        let mut seen: Vec<&str> = Vec::new();
        let names = loss_objects
            .iter()
            .map(|loss| loss.name())
            .chain(extra_losses.iter().map(String::as_str));
        for name in names {
            if name == TOTAL_LOSS || seen.contains(&name) {
                return Err(Error::invalid_config(format!(
                    "duplicate or reserved loss name '{}'",
                    name
                )));
            }
            seen.push(name);
        }

        Ok(Self {
            name: name.into(),
            loss_objects,
            extra_losses,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered loss names followed by `total_loss`.
    pub fn loss_names(&self) -> Vec<String> {
        self.registered_names()
            .map(str::to_string)
            .chain(std::iter::once(TOTAL_LOSS.to_string()))
            .collect()
    }

    fn registered_names(&self) -> impl Iterator<Item = &str> {
        self.loss_objects
            .iter()
            .map(|loss| loss.name())
            .chain(self.extra_losses.iter().map(String::as_str))
    }

    /// Evaluate every loss object on real and generated audio.
    pub fn add_losses(
        &self,
        losses: &mut LossAccumulator<B>,
        audio: Tensor<B, 2>,
        audio_gen: Tensor<B, 2>,
    ) -> Result<()> {
        for loss_object in &self.loss_objects {
            let value = loss_object.loss(audio.clone(), audio_gen.clone())?;
            losses.add(loss_object.name(), value);
        }
        Ok(())
    }

    /// One entry per registered loss (0 when not recorded) and `total_loss`.
    pub fn losses_dict(&self, losses: &LossAccumulator<B>) -> Result<LossReport> {
        let mut values = Vec::new();
        for name in self.registered_names() {
            let value = match losses.get(name) {
                Some(loss) => scalar(loss.clone())?,
                None => 0.0,
            };
            values.push((name.to_string(), value));
        }
        Ok(LossReport::from_losses(values))
    }
}
