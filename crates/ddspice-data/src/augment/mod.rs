//! Pitch-shift augmentation.
//!
//! Shifting by `n` steps time-stretches the signal by `2^(-n / bins_per_octave)`
//! with a phase vocoder, then resamples it back to the original duration, so
//! the output has the input's length and sample rate at a transposed pitch.

mod resample;
mod stft;

pub use resample::resample;
pub use stft::PhaseVocoder;

use crate::error::{Error, Result};
use crate::provider::{DataProvider, RecordIter};
use ddspice_core::{pitch, AugmentConfig, FeatureRecord, ResampleQuality};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// A transposed waveform and the steps that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchShift {
    pub audio: Vec<f32>,
    pub steps: i32,
}

/// Transposes waveforms while keeping their length.
pub struct PitchShifter {
    vocoder: PhaseVocoder,
    bins_per_octave: u32,
    max_shift_steps: u32,
    shift_limit: u32,
    quality: ResampleQuality,
}

impl PitchShifter {
    /// Fails if `config` does not validate.
    pub fn new(config: &AugmentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            vocoder: PhaseVocoder::default(),
            bins_per_octave: config.bins_per_octave,
            max_shift_steps: config.max_shift_steps,
            shift_limit: config.shift_limit(),
            quality: config.quality,
        })
    }

    pub fn max_shift_steps(&self) -> u32 {
        self.max_shift_steps
    }

    /// Shift `audio` by `steps`. Zero steps returns an exact copy.
    pub fn shift(&self, audio: &[f32], steps: i32) -> Result<Vec<f32>> {
        if steps == 0 || audio.is_empty() {
            return Ok(audio.to_vec());
        }
        if steps.unsigned_abs() > self.shift_limit {
            return Err(Error::InvalidInput(format!(
                "pitch shift of {} steps out of range",
                steps
            )));
        }

        let rate = 1.0 / pitch::transposition_ratio(steps as f32, self.bins_per_octave);
        let stretched = self.vocoder.time_stretch(audio, rate);
        let mut shifted = resample(&stretched, rate as f64, self.quality)?;
        shifted.resize(audio.len(), 0.0);
        Ok(shifted)
    }

    /// Shift by a step count drawn uniformly from `[-max, max]`.
    pub fn shift_random<R: Rng>(&self, audio: &[f32], rng: &mut R) -> Result<PitchShift> {
        let max = self.max_shift_steps as i32;
        let steps = rng.gen_range(-max..=max);
        Ok(PitchShift {
            audio: self.shift(audio, steps)?,
            steps,
        })
    }

    /// Attach a random shift to `record`, replacing any previous one.
    pub fn augment<R: Rng>(
        &self,
        record: FeatureRecord,
        rng: &mut R,
    ) -> Result<FeatureRecord> {
        let shift = self.shift_random(&record.audio, rng)?;
        Ok(record.with_pitch_shift(shift.audio, shift.steps as f32))
    }
}

/// Wraps a provider and adds `shifted_audio` and `pitch_shift_steps` to every
/// record.
///
/// Records are augmented in parallel in groups. The shift for each record is
/// drawn from its own generator seeded by epoch and position, so results do
/// not depend on thread scheduling.
pub struct AugmentedProvider<P> {
    inner: P,
    shifter: PitchShifter,
    seed: u64,
    epoch: AtomicU64,
    group_size: usize,
}

impl<P: DataProvider> AugmentedProvider<P> {
    pub fn new(inner: P, config: &AugmentConfig) -> Result<Self> {
        Ok(Self {
            inner,
            shifter: PitchShifter::new(config)?,
            seed: config.seed.unwrap_or_else(rand::random),
            epoch: AtomicU64::new(0),
            group_size: rayon::current_num_threads().max(1) * 2,
        })
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn shifter(&self) -> &PitchShifter {
        &self.shifter
    }
}

impl<P: DataProvider> DataProvider for AugmentedProvider<P> {
    fn get_dataset(&self, shuffle: bool) -> Result<RecordIter<'_>> {
        let epoch = self.epoch.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(AugmentIter {
            inner: self.inner.get_dataset(shuffle)?,
            shifter: &self.shifter,
            seed: self.seed ^ epoch.wrapping_mul(0x9E37_79B9_7F4A_7C15),
            index: 0,
            group_size: self.group_size,
            ready: VecDeque::new(),
        }))
    }
}

struct AugmentIter<'a> {
    inner: RecordIter<'a>,
    shifter: &'a PitchShifter,
    seed: u64,
    index: u64,
    group_size: usize,
    ready: VecDeque<Result<FeatureRecord>>,
}

impl AugmentIter<'_> {
    fn fill(&mut self) {
        let start = self.index;
        let group: Vec<(u64, Result<FeatureRecord>)> = self
            .inner
            .by_ref()
            .take(self.group_size)
            .enumerate()
            .map(|(i, record)| (start + i as u64, record))
            .collect();
        self.index += group.len() as u64;

        let shifter = self.shifter;
        let seed = self.seed;
        let augmented: Vec<Result<FeatureRecord>> = group
            .into_par_iter()
            .map(|(index, record)| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index));
                shifter.augment(record?, &mut rng)
            })
            .collect();
        self.ready.extend(augmented);
    }
}

impl Iterator for AugmentIter<'_> {
    type Item = Result<FeatureRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.ready.is_empty() {
            self.fill();
        }
        self.ready.pop_front()
    }
}
