//! Validate command implementation.

use super::{open_store, source_dir};
use anyhow::{Context, Result};
use fxmaster_lib::prelude::*;
use std::path::PathBuf;

/// Reconciles every source file under `dir` with the store.
pub(crate) async fn validate(
    settings: &Settings,
    dir: Option<PathBuf>,
    symbol: Option<&str>,
    fast: bool,
) -> Result<()> {
    let dir = source_dir(settings, dir)?;
    let store = open_store(settings)?;
    let options = settings.ingest.load_options();

    let mut validator = Validator::new(store, &options.table, options.tolerance);
    if let Some(table) = &options.validation_table {
        validator = validator.with_cache(table);
    }

    let files = Catalog::new(&dir)
        .files()
        .with_context(|| format!("Failed to walk {}", dir.display()))?;

    println!(
        "{:<16} {:<13} {:>10} {:>10} {:>8}",
        "FILE", "STATUS", "SOURCE", "STORED", "DIFF"
    );
    let mut unsatisfactory = 0usize;
    for file in files
        .iter()
        .filter(|f| symbol.is_none_or(|s| f.symbol.eq_ignore_ascii_case(s)))
    {
        let outcome = if fast {
            validator.validate_fast(file, &options.provider).await
        } else {
            validator.validate(file, &options.provider).await
        }
        .with_context(|| format!("Failed to validate {file}"))?;

        match outcome {
            Ok(outcome) => {
                if !outcome.is_satisfactory() {
                    unsatisfactory += 1;
                }
                println!(
                    "{:<16} {:<13} {:>10} {:>10} {:>8}",
                    file.file_id(),
                    outcome.status.as_str(),
                    outcome.csv_row_count,
                    outcome.store_row_count,
                    outcome.difference
                );
            }
            Err(e) => {
                unsatisfactory += 1;
                println!("{:<16} {:<13} {e}", file.file_id(), "unreadable");
            }
        }
    }

    println!("\n{unsatisfactory} bucket(s) need a reload");
    Ok(())
}
