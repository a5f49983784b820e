//! Centralized error type for the ddspice umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] ddspice_core::Error),

    #[cfg(feature = "data")]
    #[error("Data: {0}")]
    Data(#[from] ddspice_data::Error),

    #[error("Model: {0}")]
    Model(#[from] ddspice_burn::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
