//! Data pipeline for DDSPICE training.
//!
//! - [`DataProvider`]: epoch iteration plus a prefetching [`BatchStream`]
//! - [`MemoryProvider`]: records held in memory, seeded shuffling
//! - [`AugmentedProvider`]: adds a pitch-shifted copy of every waveform
//!
//! ```rust,ignore
//! use ddspice_data::{AugmentedProvider, DataProvider, MemoryProvider};
//! use std::sync::Arc;
//!
//! let provider = Arc::new(AugmentedProvider::new(records, &config.augmentation)?);
//! for batch in provider.get_batch(16, true, None)? {
//!     let batch = batch?;
//!     // ...
//! }
//! ```

mod error;
pub use error::{Error, Result};

mod provider;
pub use provider::{BatchStream, DataProvider, MemoryProvider, RecordIter};

pub mod augment;
pub use augment::{AugmentedProvider, PitchShift, PitchShifter};
