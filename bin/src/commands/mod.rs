//! CLI command implementations.

pub(crate) mod load;
pub(crate) mod playback;
pub(crate) mod resample;
pub(crate) mod runs;
pub(crate) mod series;
pub(crate) mod validate;

use anyhow::{Context, Result};
use fxmaster_lib::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

/// Opens the configured store.
pub(crate) fn open_store(settings: &Settings) -> Result<Arc<dyn TickStore>> {
    settings
        .store
        .open()
        .with_context(|| format!("Failed to open store at {}", settings.store.url))
}

/// Picks the source directory from the argument or the settings.
pub(crate) fn source_dir(settings: &Settings, dir: Option<PathBuf>) -> Result<PathBuf> {
    dir.or_else(|| settings.ingest.source_dir.clone())
        .context("No source directory: pass one or set ingest.source_dir")
}
