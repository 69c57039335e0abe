//! Load journal command implementation.

use crate::display::format_time;
use anyhow::{Context, Result};
use fxmaster_lib::prelude::*;
use fxmaster_lib::LoadRun;

/// Lists runs, shows one run, or removes finished runs.
pub(crate) fn runs(settings: &Settings, run_id: Option<&str>, clean: bool) -> Result<()> {
    let journal = settings
        .journal
        .open()
        .context("Failed to open load journal")?;

    if clean {
        return clean_runs(&journal);
    }
    if let Some(id) = run_id {
        return show_run(&journal, id);
    }

    let runs = journal.list()?;
    if runs.is_empty() {
        println!("No load runs found.");
        return Ok(());
    }
    println!(
        "{:<36}  {:<10} {:<19}  {:>7} {:>7} {:>7}  TARGET",
        "ID", "STATUS", "CREATED", "LOADED", "SKIPPED", "FAILED"
    );
    for run in &runs {
        println!(
            "{:<36}  {:<10} {:<19}  {:>7} {:>7} {:>7}  {}/{}",
            run.id,
            run.status.as_str(),
            format_time(Some(run.created_at)),
            run.loaded.len(),
            run.skipped.len(),
            run.failed.len(),
            run.table,
            run.provider
        );
    }
    Ok(())
}

fn show_run(journal: &JournalStore, id: &str) -> Result<()> {
    let id = id.parse().context("Invalid run ID format")?;
    let run = journal.load(id).context("Run not found")?;

    println!("Run: {}", run.id);
    println!("Status: {}", run.status);
    println!("Source: {}", run.source_dir.display());
    println!("Target: {} ({})", run.table, run.provider);
    println!("Created: {}", format_time(Some(run.created_at)));
    println!("Finished: {}", format_time(run.finished_at));
    if let Some(file_id) = &run.in_progress {
        println!("Interrupted in: {file_id}");
    }
    if let Some(error) = &run.error {
        println!("Error: {error}");
    }
    print_buckets("Loaded", &run.loaded);
    print_buckets("Skipped", &run.skipped);
    print_buckets("Failed", &run.failed);
    Ok(())
}

fn print_buckets(label: &str, buckets: &[String]) {
    println!("{label}: {}", buckets.len());
    for file_id in buckets {
        println!("  {file_id}");
    }
}

/// Finished runs that hold no interrupted bucket are safe to forget.
const fn removable(run: &LoadRun) -> bool {
    run.status.is_finished() && run.in_progress.is_none()
}

fn clean_runs(journal: &JournalStore) -> Result<()> {
    let mut removed = 0;
    for run in journal.list()?.iter().filter(|run| removable(run)) {
        journal.delete(run.id)?;
        removed += 1;
    }
    println!("Removed {removed} finished run(s).");
    Ok(())
}
