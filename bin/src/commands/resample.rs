//! Resample command implementations.

use super::open_store;
use crate::display::print_resample_report;
use anyhow::{Context, Result};
use chrono::TimeDelta;
use fxmaster_lib::prelude::*;

fn resampler(settings: &Settings, stop: StopFlag) -> Result<Resampler> {
    Ok(Resampler::new(open_store(settings)?)
        .with_chunk_size(TimeDelta::hours(settings.resample.chunk_hours))
        .with_stop_flag(stop))
}

/// Resamples one series at the configured frequency.
pub(crate) async fn resample(
    settings: &Settings,
    series: &SeriesKey,
    window: Option<TimeWindow>,
    incremental: bool,
    stop: StopFlag,
) -> Result<()> {
    let resample = &settings.resample;
    let output_table = resample.frequency.table_name(&resample.output_prefix);
    let resampler = resampler(settings, stop)?;

    let report = if incremental {
        resampler
            .resample_incremental(series, &resample.input_table, &output_table, resample.frequency)
            .await
    } else {
        resampler
            .resample(
                series,
                &resample.input_table,
                &output_table,
                resample.frequency,
                window,
            )
            .await
    }
    .with_context(|| format!("Failed to resample {series} into {output_table}"))?;

    print_resample_report(&report);
    Ok(())
}

/// Incrementally resamples every series in the input table.
pub(crate) async fn resample_all(settings: &Settings, stop: StopFlag) -> Result<()> {
    let resample = &settings.resample;
    let reports = resampler(settings, stop)?
        .resample_all(
            &resample.input_table,
            &resample.output_prefix,
            resample.frequency,
        )
        .await
        .with_context(|| format!("Failed to resample {}", resample.input_table))?;

    for report in &reports {
        print_resample_report(report);
    }
    let bars: usize = reports.iter().map(|r| r.bars_written).sum();
    println!("\n{} series, {bars} bars written", reports.len());
    Ok(())
}
