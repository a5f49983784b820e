//! Checkpoint layout and module persistence.
//!
//! ```text
//! <dir>/ckpt-<step>/<component>.mpk
//! ```
//!
//! The newest checkpoint is the one with the highest step. Each stateful
//! component is its own named MessagePack record, so a checkpoint that lacks
//! a component (or holds one that no longer decodes) can still restore the
//! rest.

use crate::error::{Error, Result};
use burn::module::Module;
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use std::path::{Path, PathBuf};

const CHECKPOINT_PREFIX: &str = "ckpt-";
const RECORD_EXTENSION: &str = "mpk";

fn recorder() -> NamedMpkFileRecorder<FullPrecisionSettings> {
    NamedMpkFileRecorder::<FullPrecisionSettings>::new()
}

/// Directory of the checkpoint for `step` under `dir`.
pub fn checkpoint_dir(dir: &Path, step: u64) -> PathBuf {
    dir.join(format!("{}{}", CHECKPOINT_PREFIX, step))
}

fn checkpoint_step(path: &Path) -> Option<u64> {
    path.file_name()?
        .to_str()?
        .strip_prefix(CHECKPOINT_PREFIX)?
        .parse()
        .ok()
}

/// Find the newest checkpoint at `path`.
///
/// `path` may be a checkpoint directory itself or a directory holding several.
/// A missing or empty directory yields `None`.
pub fn latest_checkpoint(path: &Path) -> Result<Option<PathBuf>> {
    if !path.is_dir() {
        return Ok(None);
    }
    if checkpoint_step(path).is_some() {
        return Ok(Some(path.to_path_buf()));
    }

    let mut latest: Option<(u64, PathBuf)> = None;
    for entry in std::fs::read_dir(path)? {
        let candidate = entry?.path();
        if !candidate.is_dir() {
            continue;
        }
        if let Some(step) = checkpoint_step(&candidate) {
            if latest.as_ref().map_or(true, |(best, _)| step > *best) {
                latest = Some((step, candidate));
            }
        }
    }
    Ok(latest.map(|(_, path)| path))
}

/// Record a module at `path` (extension added).
pub fn save_module<B: Backend, M: Module<B>>(module: M, path: &Path) -> Result<()> {
    module.save_file(path.to_path_buf(), &recorder())?;
    tracing::debug!("Saved {}.{}", path.display(), RECORD_EXTENSION);
    Ok(())
}

/// Load a module from `path` into a copy of `module`.
///
/// Returns `None` when no record exists. A record that fails to decode is an
/// error.
pub fn load_module<B: Backend, M: Module<B>>(
    module: &M,
    path: &Path,
    device: &B::Device,
) -> Result<Option<M>> {
    if !path.with_extension(RECORD_EXTENSION).is_file() {
        return Ok(None);
    }
    let loaded = module
        .clone()
        .load_file(path.to_path_buf(), &recorder(), device)
        .map_err(|e| Error::Checkpoint(format!("{}: {:?}", path.display(), e)))?;
    Ok(Some(loaded))
}
