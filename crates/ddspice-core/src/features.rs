//! Feature records: the per-example contract between data providers and models.
//!
//! A record carries one fixed-length waveform (`audio`, length `L_a`) and three
//! frame-rate sequences (`f0_hz`, `f0_confidence`, `loudness_db`, length `L_f`).
//! Augmented records additionally carry `shifted_audio` (length `L_a`) and the
//! semitone count used to produce it.

use crate::config::DataConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

pub const AUDIO: &str = "audio";
pub const F0_HZ: &str = "f0_hz";
pub const F0_CONFIDENCE: &str = "f0_confidence";
pub const LOUDNESS_DB: &str = "loudness_db";
pub const SHIFTED_AUDIO: &str = "shifted_audio";
pub const PITCH_SHIFT_STEPS: &str = "pitch_shift_steps";

/// Fixed lengths every record in a dataset must share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureShape {
    /// Samples per example (`L_a`).
    pub audio_length: usize,
    /// Analysis frames per example (`L_f`).
    pub feature_length: usize,
}

impl FeatureShape {
    pub fn new(audio_length: usize, feature_length: usize) -> Self {
        Self {
            audio_length,
            feature_length,
        }
    }
}

impl From<&DataConfig> for FeatureShape {
    fn from(config: &DataConfig) -> Self {
        Self::new(config.audio_length(), config.feature_length())
    }
}

/// One example as produced by a data provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub audio: Vec<f32>,
    pub f0_hz: Vec<f32>,
    pub f0_confidence: Vec<f32>,
    pub loudness_db: Vec<f32>,

    #[serde(default)]
    pub pitch: Option<i64>,
    #[serde(default)]
    pub instrument: Option<i64>,
    #[serde(default)]
    pub instrument_source: Option<i64>,
    #[serde(default)]
    pub instrument_family: Option<i64>,

    /// Transposed copy of `audio`, same length.
    #[serde(default)]
    pub shifted_audio: Option<Vec<f32>>,
    /// Semitones applied to produce `shifted_audio`.
    #[serde(default)]
    pub pitch_shift_steps: Option<f32>,
}

impl FeatureRecord {
    pub fn new(
        audio: Vec<f32>,
        f0_hz: Vec<f32>,
        f0_confidence: Vec<f32>,
        loudness_db: Vec<f32>,
    ) -> Self {
        Self {
            audio,
            f0_hz,
            f0_confidence,
            loudness_db,
            ..Self::default()
        }
    }

    /// All-zero record of the given shape.
    pub fn silent(shape: FeatureShape) -> Self {
        Self::new(
            vec![0.0; shape.audio_length],
            vec![0.0; shape.feature_length],
            vec![0.0; shape.feature_length],
            vec![0.0; shape.feature_length],
        )
    }

    pub fn with_pitch_shift(mut self, shifted_audio: Vec<f32>, steps: f32) -> Self {
        self.shifted_audio = Some(shifted_audio);
        self.pitch_shift_steps = Some(steps);
        self
    }

    pub fn is_augmented(&self) -> bool {
        self.shifted_audio.is_some() && self.pitch_shift_steps.is_some()
    }

    /// Shape implied by this record's own sequences.
    pub fn shape(&self) -> FeatureShape {
        FeatureShape::new(self.audio.len(), self.f0_hz.len())
    }

    /// Check every sequence against `shape`.
    pub fn validate(&self, shape: &FeatureShape) -> Result<()> {
        check_len(AUDIO, shape.audio_length, self.audio.len())?;
        check_len(F0_HZ, shape.feature_length, self.f0_hz.len())?;
        check_len(F0_CONFIDENCE, shape.feature_length, self.f0_confidence.len())?;
        check_len(LOUDNESS_DB, shape.feature_length, self.loudness_db.len())?;

        match (&self.shifted_audio, self.pitch_shift_steps) {
            (Some(shifted), Some(_)) => check_len(SHIFTED_AUDIO, shape.audio_length, shifted.len()),
            (None, None) => Ok(()),
            (Some(_), None) => Err(Error::MissingFeature(PITCH_SHIFT_STEPS.into())),
            (None, Some(_)) => Err(Error::MissingFeature(SHIFTED_AUDIO.into())),
        }
    }
}

fn check_len(field: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::shape_mismatch(field, expected, actual));
    }
    Ok(())
}

/// A batch of records sharing one [`FeatureShape`].
///
/// Columns are exposed flattened row-major (`batch * length`) so tensor
/// backends can build `(batch, length)` tensors without further copies.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBatch {
    records: Vec<FeatureRecord>,
    shape: FeatureShape,
}

impl FeatureBatch {
    /// Build a batch, rejecting empty input, ragged shapes and records that
    /// disagree on whether they are augmented.
    pub fn new(records: Vec<FeatureRecord>) -> Result<Self> {
        let first = records.first().ok_or(Error::EmptyBatch)?;
        let shape = first.shape();
        let augmented = first.is_augmented();

        for record in &records {
            record.validate(&shape)?;
            if record.is_augmented() != augmented {
                let missing = if augmented { SHIFTED_AUDIO } else { PITCH_SHIFT_STEPS };
                return Err(Error::MissingFeature(missing.into()));
            }
        }

        Ok(Self { records, shape })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn shape(&self) -> FeatureShape {
        self.shape
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<FeatureRecord> {
        self.records
    }

    pub fn is_augmented(&self) -> bool {
        self.records.iter().all(FeatureRecord::is_augmented)
    }

    pub fn audio(&self) -> Vec<f32> {
        self.column(|r| &r.audio)
    }

    pub fn f0_hz(&self) -> Vec<f32> {
        self.column(|r| &r.f0_hz)
    }

    pub fn f0_confidence(&self) -> Vec<f32> {
        self.column(|r| &r.f0_confidence)
    }

    pub fn loudness_db(&self) -> Vec<f32> {
        self.column(|r| &r.loudness_db)
    }

    pub fn shifted_audio(&self) -> Option<Vec<f32>> {
        if !self.is_augmented() {
            return None;
        }
        let mut out = Vec::with_capacity(self.len() * self.shape.audio_length);
        for record in &self.records {
            out.extend_from_slice(record.shifted_audio.as_deref()?);
        }
        Some(out)
    }

    pub fn pitch_shift_steps(&self) -> Option<Vec<f32>> {
        self.records.iter().map(|r| r.pitch_shift_steps).collect()
    }

    /// Categorical scalar column, present only when every record has it.
    pub fn categorical(&self, field: impl Fn(&FeatureRecord) -> Option<i64>) -> Option<Vec<i64>> {
        self.records.iter().map(field).collect()
    }

    fn column(&self, field: impl Fn(&FeatureRecord) -> &Vec<f32>) -> Vec<f32> {
        let width = field(&self.records[0]).len();
        let mut out = Vec::with_capacity(self.len() * width);
        for record in &self.records {
            out.extend_from_slice(field(record));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> FeatureShape {
        FeatureShape::new(64, 4)
    }

    #[test]
    fn test_silent_record_validates() {
        let record = FeatureRecord::silent(shape());
        assert!(record.validate(&shape()).is_ok());
        assert!(!record.is_augmented());
    }

    #[test]
    fn test_validate_reports_field() {
        let mut record = FeatureRecord::silent(shape());
        record.loudness_db.pop();

        match record.validate(&shape()) {
            Err(Error::ShapeMismatch {
                field,
                expected,
                actual,
            }) => {
                assert_eq!(field, LOUDNESS_DB);
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_half_augmented_record_rejected() {
        let mut record = FeatureRecord::silent(shape());
        record.pitch_shift_steps = Some(3.0);
        assert!(matches!(
            record.validate(&shape()),
            Err(Error::MissingFeature(f)) if f == SHIFTED_AUDIO
        ));
    }

    #[test]
    fn test_batch_columns_are_row_major() {
        let mut a = FeatureRecord::silent(shape());
        let mut b = FeatureRecord::silent(shape());
        a.f0_hz = vec![1.0, 2.0, 3.0, 4.0];
        b.f0_hz = vec![5.0, 6.0, 7.0, 8.0];

        let batch = FeatureBatch::new(vec![a, b]).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(
            batch.f0_hz(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]
        );
        assert_eq!(batch.audio().len(), 128);
        assert!(batch.shifted_audio().is_none());
        assert!(batch.pitch_shift_steps().is_none());
    }

    #[test]
    fn test_batch_rejects_ragged() {
        let a = FeatureRecord::silent(shape());
        let b = FeatureRecord::silent(FeatureShape::new(32, 4));
        assert!(matches!(
            FeatureBatch::new(vec![a, b]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_batch_rejects_mixed_augmentation() {
        let a = FeatureRecord::silent(shape()).with_pitch_shift(vec![0.0; 64], 2.0);
        let b = FeatureRecord::silent(shape());
        assert!(FeatureBatch::new(vec![a, b]).is_err());
    }

    #[test]
    fn test_empty_batch() {
        assert!(matches!(FeatureBatch::new(vec![]), Err(Error::EmptyBatch)));
    }

    #[test]
    fn test_augmented_batch_columns() {
        let a = FeatureRecord::silent(shape()).with_pitch_shift(vec![1.0; 64], -3.0);
        let b = FeatureRecord::silent(shape()).with_pitch_shift(vec![2.0; 64], 7.0);
        let batch = FeatureBatch::new(vec![a, b]).unwrap();

        assert_eq!(batch.pitch_shift_steps(), Some(vec![-3.0, 7.0]));
        let shifted = batch.shifted_audio().unwrap();
        assert_eq!(shifted.len(), 128);
        assert_eq!(shifted[0], 1.0);
        assert_eq!(shifted[64], 2.0);
    }

    #[test]
    fn test_categorical_requires_all() {
        let mut a = FeatureRecord::silent(shape());
        let mut b = FeatureRecord::silent(shape());
        a.instrument = Some(3);
        let batch = FeatureBatch::new(vec![a.clone(), b.clone()]).unwrap();
        assert!(batch.categorical(|r| r.instrument).is_none());

        b.instrument = Some(9);
        let batch = FeatureBatch::new(vec![a, b]).unwrap();
        assert_eq!(batch.categorical(|r| r.instrument), Some(vec![3, 9]));
    }
}
