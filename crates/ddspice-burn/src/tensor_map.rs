//! Ordered name → tensor maps for conditioning, processor inputs and controls.

use crate::error::{Error, Result};
use burn::prelude::*;

/// Named `(batch, time, channels)` tensors in insertion order.
#[derive(Debug, Clone)]
pub struct TensorMap<B: Backend> {
    entries: Vec<(String, Tensor<B, 3>)>,
}

impl<B: Backend> Default for TensorMap<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> TensorMap<B> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert or replace `name`. Replacement keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor<B, 3>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = tensor,
            None => self.entries.push((name, tensor)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, tensor: Tensor<B, 3>) -> Self {
        self.insert(name, tensor);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Tensor<B, 3>> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, tensor)| tensor)
    }

    /// Like [`get`](Self::get), but a missing entry is an error.
    pub fn require(&self, name: &str) -> Result<Tensor<B, 3>> {
        self.get(name)
            .cloned()
            .ok_or_else(|| Error::MissingTensor(name.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Option<Tensor<B, 3>> {
        let index = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor<B, 3>)> {
        self.entries.iter().map(|(key, tensor)| (key.as_str(), tensor))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep only `keys`, in the requested order.
    pub fn select(mut self, keys: &[&str]) -> Result<Self> {
        let mut selected = Self::new();
        for key in keys {
            let tensor = self
                .remove(key)
                .or_else(|| selected.get(key).cloned())
                .ok_or_else(|| Error::UnknownControl(key.to_string()))?;
            selected.insert(*key, tensor);
        }
        Ok(selected)
    }

    /// Add every entry of `other`, replacing existing names.
    pub fn extend(&mut self, other: TensorMap<B>) {
        for (name, tensor) in other {
            self.insert(name, tensor);
        }
    }
}

impl<B: Backend> IntoIterator for TensorMap<B> {
    type Item = (String, Tensor<B, 3>);
    type IntoIter = std::vec::IntoIter<(String, Tensor<B, 3>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<B: Backend, S: Into<String>> FromIterator<(S, Tensor<B, 3>)> for TensorMap<B> {
    fn from_iter<I: IntoIterator<Item = (S, Tensor<B, 3>)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, tensor) in iter {
            map.insert(name, tensor);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn map() -> TensorMap<TestBackend> {
        let device = NdArrayDevice::default();
        TensorMap::new()
            .with("amps", Tensor::ones([1, 4, 1], &device))
            .with("harmonic_distribution", Tensor::zeros([1, 4, 8], &device))
            .with("noise_magnitudes", Tensor::full([1, 4, 3], 2.0, &device))
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let device = NdArrayDevice::default();
        let mut map = map();
        map.insert("amps", Tensor::zeros([1, 4, 2], &device));

        assert_eq!(map.len(), 3);
        assert_eq!(map.keys().next(), Some("amps"));
        assert_eq!(map.get("amps").unwrap().dims(), [1, 4, 2]);
    }

    #[test]
    fn test_select_subset() {
        let selected = map().select(&["noise_magnitudes"]).unwrap();
        assert_eq!(selected.keys().collect::<Vec<_>>(), vec!["noise_magnitudes"]);
        assert_eq!(selected.get("noise_magnitudes").unwrap().dims(), [1, 4, 3]);
    }

    #[test]
    fn test_select_orders_by_request() {
        let selected = map().select(&["noise_magnitudes", "amps"]).unwrap();
        assert_eq!(
            selected.keys().collect::<Vec<_>>(),
            vec!["noise_magnitudes", "amps"]
        );
    }

    #[test]
    fn test_select_duplicate_key() {
        let selected = map().select(&["amps", "amps"]).unwrap();
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_select_unknown_key() {
        assert!(matches!(
            map().select(&["reverb_ir"]),
            Err(Error::UnknownControl(k)) if k == "reverb_ir"
        ));
    }

    #[test]
    fn test_require() {
        let map = map();
        assert!(map.require("amps").is_ok());
        assert!(matches!(map.require("f0_scaled"), Err(Error::MissingTensor(_))));
    }

    #[test]
    fn test_collect_and_extend() {
        let device = NdArrayDevice::default();
        let mut collected: TensorMap<TestBackend> =
            vec![("a", Tensor::ones([1, 1, 1], &device))].into_iter().collect();
        collected.extend(map());
        assert_eq!(collected.len(), 4);
        assert!(collected.contains("harmonic_distribution"));
    }
}
