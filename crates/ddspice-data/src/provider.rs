//! Data providers and the prefetching batch stream.
//!
//! A provider yields one epoch of [`FeatureRecord`]s per call to
//! [`DataProvider::get_dataset`]. [`DataProvider::get_batch`] repeats epochs,
//! groups records into fixed-size [`FeatureBatch`]es on a loader thread and
//! hands them over through a bounded channel.

use crate::error::{Error, Result};
use crossbeam_channel::{bounded, Receiver};
use ddspice_core::{FeatureBatch, FeatureRecord, FeatureShape};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// One pass over a dataset.
pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<FeatureRecord>> + Send + 'a>;

/// Source of feature records.
pub trait DataProvider: Send + Sync {
    /// Iterate one epoch. With `shuffle`, each call may use a new order.
    fn get_dataset(&self, shuffle: bool) -> Result<RecordIter<'_>>;

    /// Stream batches of `batch_size` records.
    ///
    /// Batches run across epoch boundaries; only the incomplete remainder at
    /// the very end is dropped. `repeats` bounds the number of epochs, `None`
    /// repeats until the stream is dropped.
    fn get_batch(
        self: Arc<Self>,
        batch_size: usize,
        shuffle: bool,
        repeats: Option<usize>,
    ) -> Result<BatchStream>
    where
        Self: Sized + 'static,
    {
        BatchStream::spawn(self, batch_size, shuffle, repeats, default_prefetch())
    }
}

fn default_prefetch() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
}

/// Iterator over batches produced by a background loader thread.
///
/// Dropping the stream disconnects the channel and joins the loader.
pub struct BatchStream {
    receiver: Option<Receiver<Result<FeatureBatch>>>,
    handle: Option<JoinHandle<()>>,
}

impl BatchStream {
    /// Start a loader thread that keeps up to `prefetch` batches queued.
    pub fn spawn<P>(
        provider: Arc<P>,
        batch_size: usize,
        shuffle: bool,
        repeats: Option<usize>,
        prefetch: usize,
    ) -> Result<Self>
    where
        P: DataProvider + 'static,
    {
        if batch_size == 0 {
            return Err(Error::InvalidInput("batch_size must be positive".into()));
        }

        let (sender, receiver) = bounded(prefetch.max(1));
        let handle = std::thread::Builder::new()
            .name("ddspice-loader".into())
            .spawn(move || {
                let mut pending = Vec::with_capacity(batch_size);
                let mut epoch = 0usize;

                while repeats.map_or(true, |r| epoch < r) {
                    let records = match provider.get_dataset(shuffle) {
                        Ok(records) => records,
                        Err(e) => {
                            let _ = sender.send(Err(e));
                            return;
                        }
                    };

                    let mut seen = 0usize;
                    for record in records {
                        let record = match record {
                            Ok(record) => record,
                            Err(e) => {
                                let _ = sender.send(Err(e));
                                return;
                            }
                        };
                        seen += 1;
                        pending.push(record);

                        if pending.len() == batch_size {
                            let records = std::mem::replace(
                                &mut pending,
                                Vec::with_capacity(batch_size),
                            );
                            let batch = FeatureBatch::new(records).map_err(Error::from);
                            if sender.send(batch).is_err() {
                                return;
                            }
                        }
                    }

                    if seen == 0 {
                        tracing::warn!("Dataset yielded no records, stopping batch stream");
                        break;
                    }
                    epoch += 1;
                    tracing::debug!("Finished epoch {}", epoch);
                }

                if !pending.is_empty() {
                    tracing::debug!("Dropping final partial batch of {}", pending.len());
                }
            })
            .map_err(|e| Error::Loader(e.to_string()))?;

        Ok(Self {
            receiver: Some(receiver),
            handle: Some(handle),
        })
    }
}

impl Iterator for BatchStream {
    type Item = Result<FeatureBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.as_ref()?.recv().ok()
    }
}

impl Drop for BatchStream {
    fn drop(&mut self) {
        self.receiver.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Loader thread panicked");
            }
        }
    }
}

/// In-memory provider over a fixed list of records.
///
/// Shuffled epochs use a fresh permutation each time, reproducible from the
/// seed.
pub struct MemoryProvider {
    records: Vec<FeatureRecord>,
    seed: u64,
    epoch: AtomicU64,
}

impl MemoryProvider {
    /// All records must share one shape.
    pub fn new(records: Vec<FeatureRecord>) -> Result<Self> {
        if let Some(first) = records.first() {
            let shape = first.shape();
            for record in &records {
                record.validate(&shape)?;
            }
        }
        Ok(Self {
            records,
            seed: rand::random(),
            epoch: AtomicU64::new(0),
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// `count` silent records of the given shape.
    pub fn silent(shape: FeatureShape, count: usize) -> Self {
        Self {
            records: vec![FeatureRecord::silent(shape); count],
            seed: rand::random(),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl DataProvider for MemoryProvider {
    fn get_dataset(&self, shuffle: bool) -> Result<RecordIter<'_>> {
        let mut order: Vec<usize> = (0..self.records.len()).collect();
        if shuffle {
            let epoch = self.epoch.fetch_add(1, Ordering::Relaxed);
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(epoch));
            order.shuffle(&mut rng);
        }
        Ok(Box::new(
            order.into_iter().map(move |i| Ok(self.records[i].clone())),
        ))
    }
}
