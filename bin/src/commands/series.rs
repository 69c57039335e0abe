//! Series report command implementation.

use super::open_store;
use crate::display::format_time;
use anyhow::{Context, Result};
use fxmaster_lib::prelude::*;

/// Lists the series stored in `table`.
pub(crate) async fn series(settings: &Settings, table: &str, buckets: bool) -> Result<()> {
    let store = open_store(settings)?;
    let all = store
        .series(table)
        .await
        .with_context(|| format!("Failed to list series in {table}"))?;
    if all.is_empty() {
        println!("No series in {table}");
        return Ok(());
    }

    println!(
        "{:<16} {:>12}  {:<19}  {:<19}",
        "SERIES", "ROWS", "FIRST", "LAST"
    );
    for series in &all {
        let predicate = series.predicate();
        let rows = store.count(table, &predicate).await?;
        let bounds = store.time_bounds(table, &predicate).await?;
        println!(
            "{:<16} {:>12}  {:<19}  {:<19}",
            series.to_string(),
            rows,
            format_time(bounds.map(|(first, _)| first)),
            format_time(bounds.map(|(_, last)| last)),
        );

        if buckets {
            let source_dir = settings.ingest.source_dir.as_deref();
            for (file_id, count) in store.count_by(table, &predicate, Tag::Filename).await? {
                let source = source_dir
                    .and_then(|root| SourceFile::store_path(root, &file_id))
                    .map_or_else(String::new, |path| {
                        let marker = if path.exists() { "" } else { " (missing)" };
                        format!("  {}{marker}", path.display())
                    });
                println!("  {file_id:<14} {count:>12}{source}");
            }
        }
    }
    Ok(())
}
