//! Bulk load command implementation.

use super::{open_store, source_dir};
use crate::display::bucket_progress;
use anyhow::{Context, Result};
use fxmaster_lib::prelude::*;
use fxmaster_lib::{BucketProgress, BucketResult, RunStatus};
use std::path::PathBuf;

/// Loads every weekly file under `dir`.
pub(crate) async fn load(
    settings: &Settings,
    dir: Option<PathBuf>,
    overwrite: bool,
    stop: StopFlag,
    quiet: bool,
) -> Result<()> {
    let dir = source_dir(settings, dir)?;
    let store = open_store(settings)?;
    let journal = settings
        .journal
        .open()
        .context("Failed to open load journal")?;

    let mut options = settings.ingest.load_options();
    options.overwrite = overwrite;
    let loader = BulkLoader::new(store, journal, options).with_stop_flag(stop);

    let progress = bucket_progress(quiet);
    progress.set_message(dir.display().to_string());
    let report = loader
        .load_with_progress(&dir, |bucket: &BucketProgress| {
            progress.set_length(bucket.total as u64);
            progress.set_position(bucket.index as u64 + 1);
            progress.set_message(format!("{} {}", bucket.file_id, result_label(bucket.result)));
        })
        .await
        .with_context(|| format!("Bulk load of {} failed", dir.display()))?;
    progress.finish_and_clear();

    if let Some(file_id) = &report.resumed {
        println!("Resumed interrupted bucket {file_id}");
    }
    println!("Run {}: {report}", report.run_id);
    for file_id in &report.failed {
        println!("  failed: {file_id}");
    }
    if report.status == RunStatus::Cancelled {
        println!("Run cancelled; the next load continues where this one stopped.");
    }
    Ok(())
}

const fn result_label(result: BucketResult) -> &'static str {
    match result {
        BucketResult::Loaded => "loaded",
        BucketResult::Skipped => "skipped",
        BucketResult::Failed => "failed",
    }
}
