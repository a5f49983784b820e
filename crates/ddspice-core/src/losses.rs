//! Loss reports: named scalar losses of one forward pass plus their total.

use core::fmt;
use serde::Serialize;

/// Name of the aggregate entry in every [`LossReport`].
pub const TOTAL_LOSS: &str = "total_loss";

/// Mapping from loss name to scalar value, always ending with `total_loss`.
///
/// `total_loss` is the sum of every other entry; it is computed here and
/// cannot be supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LossReport {
    entries: Vec<(String, f32)>,
}

impl LossReport {
    pub fn from_losses<I, S>(losses: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        let mut entries: Vec<(String, f32)> = losses
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .filter(|(name, _)| name != TOTAL_LOSS)
            .collect();
        let total = entries.iter().map(|(_, value)| value).sum();
        entries.push((TOTAL_LOSS.to_string(), total));
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| *value)
    }

    pub fn total(&self) -> f32 {
        self.get(TOTAL_LOSS).unwrap_or(0.0)
    }

    /// Names in report order, `total_loss` last.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Number of entries including `total_loss`.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for LossReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}={:.4}", name, value)?;
        }
        Ok(())
    }
}
