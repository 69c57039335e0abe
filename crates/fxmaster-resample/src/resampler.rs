//! Chunked resampling of stored tick series.

use chrono::{DateTime, TimeDelta, Utc};
use fxmaster_store::TickStore;
use fxmaster_types::{Frequency, Predicate, SeriesKey, StopFlag, Tag, TimeWindow};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{ResampleError, Result, aggregate};

/// Default chunk size: one day of ticks per query.
pub const DEFAULT_CHUNK_HOURS: i64 = 24;

/// How a series was resampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleMode {
    /// Every bucket in the window was computed.
    Full,
    /// Existing bars were kept and the last one recomputed onwards.
    Resumed,
    /// Existing bars did not line up with the ticks and were replaced.
    Rebuilt,
}

impl std::fmt::Display for ResampleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Full => "full",
            Self::Resumed => "resumed",
            Self::Rebuilt => "rebuilt",
        };
        f.write_str(name)
    }
}

/// Summary of resampling one series.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampleReport {
    /// The resampled series.
    pub series: SeriesKey,
    /// Bar width.
    pub frequency: Frequency,
    /// How the series was resampled.
    pub mode: ResampleMode,
    /// Window covered, or `None` if the series has no ticks.
    pub window: Option<TimeWindow>,
    /// Chunks queried.
    pub chunks: usize,
    /// Chunks without ticks.
    pub empty_chunks: usize,
    /// Bars written.
    pub bars_written: usize,
    /// Stopped before the last chunk.
    pub cancelled: bool,
}

impl ResampleReport {
    const fn empty(series: SeriesKey, frequency: Frequency, mode: ResampleMode) -> Self {
        Self {
            series,
            frequency,
            mode,
            window: None,
            chunks: 0,
            empty_chunks: 0,
            bars_written: 0,
            cancelled: false,
        }
    }
}

/// Converts tick series into OHLC bars, one time chunk at a time.
pub struct Resampler {
    store: Arc<dyn TickStore>,
    chunk_size: TimeDelta,
    stop: StopFlag,
}

impl std::fmt::Debug for Resampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resampler")
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl Resampler {
    /// Creates a resampler with daily chunks.
    pub fn new(store: Arc<dyn TickStore>) -> Self {
        Self {
            store,
            chunk_size: TimeDelta::hours(DEFAULT_CHUNK_HOURS),
            stop: StopFlag::new(),
        }
    }

    /// Sets the amount of tick time read per query.
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: TimeDelta) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Uses `stop` to cancel between chunks and series.
    #[must_use]
    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    /// Resamples `series` from `input_table` into `output_table`.
    ///
    /// With no `window`, the whole series is covered. The window is widened
    /// to bar boundaries so every bar sees all of its ticks. A `window` not
    /// aligned to `frequency` therefore writes the bar containing its start
    /// and the bar containing its end, including ticks before `start` and at
    /// or after `end` that fall into those bars.
    ///
    /// # Errors
    ///
    /// Returns an error if a store query fails or the chunk size is not a
    /// multiple of `frequency`.
    pub async fn resample(
        &self,
        series: &SeriesKey,
        input_table: &str,
        output_table: &str,
        frequency: Frequency,
        window: Option<TimeWindow>,
    ) -> Result<ResampleReport> {
        self.check_chunk_size(frequency)?;
        let window = match window {
            Some(window) => Some(align(&window, frequency)?),
            None => self.series_window(series, input_table, frequency).await?,
        };
        let report = ResampleReport::empty(series.clone(), frequency, ResampleMode::Full);
        match window {
            Some(window) => self.run(report, input_table, output_table, window).await,
            None => {
                info!(series = %series, "no ticks to resample");
                Ok(report)
            }
        }
    }

    /// Resamples `series`, continuing from the bars already in
    /// `output_table` when they line up with the ticks.
    ///
    /// Existing bars are kept if the first one starts at the bucket of the
    /// first tick; the last bar is then recomputed onwards. Otherwise the
    /// bar series is deleted and rebuilt.
    ///
    /// # Errors
    ///
    /// Returns an error if a store query fails or the chunk size is not a
    /// multiple of `frequency`.
    pub async fn resample_incremental(
        &self,
        series: &SeriesKey,
        input_table: &str,
        output_table: &str,
        frequency: Frequency,
    ) -> Result<ResampleReport> {
        self.check_chunk_size(frequency)?;
        let Some(full) = self.series_window(series, input_table, frequency).await? else {
            info!(series = %series, "no ticks to resample");
            return Ok(ResampleReport::empty(series.clone(), frequency, ResampleMode::Full));
        };

        let bars = bar_predicate(series, frequency);
        let mode = match self.store.time_bounds(output_table, &bars).await? {
            None => ResampleMode::Full,
            Some((first_bar, last_bar)) => match resume_window(&full, first_bar, last_bar) {
                Some(window) => {
                    debug!(series = %series, from = %last_bar, "resuming resample");
                    let report =
                        ResampleReport::empty(series.clone(), frequency, ResampleMode::Resumed);
                    return self.run(report, input_table, output_table, window).await;
                }
                None => {
                    warn!(
                        series = %series,
                        frequency = %frequency,
                        first_bar = %first_bar,
                        first_tick_bucket = %full.start,
                        "existing bars do not line up, rebuilding"
                    );
                    self.store.delete(output_table, &bars).await?;
                    ResampleMode::Rebuilt
                }
            },
        };

        let report = ResampleReport::empty(series.clone(), frequency, mode);
        self.run(report, input_table, output_table, full).await
    }

    /// Incrementally resamples every `(symbol, provider)` series in
    /// `input_table` into `<output_prefix>_<frequency>`.
    ///
    /// # Errors
    ///
    /// Returns the first store error; series already done are not undone.
    pub async fn resample_all(
        &self,
        input_table: &str,
        output_prefix: &str,
        frequency: Frequency,
    ) -> Result<Vec<ResampleReport>> {
        let output_table = frequency.table_name(output_prefix);
        let all = self.store.series(input_table).await?;
        info!(series = all.len(), table = %output_table, "resampling all series");

        let mut reports = Vec::with_capacity(all.len());
        for series in &all {
            if self.stop.is_stopped() {
                warn!(done = reports.len(), total = all.len(), "resample cancelled");
                break;
            }
            reports.push(
                self.resample_incremental(series, input_table, &output_table, frequency)
                    .await?,
            );
        }
        Ok(reports)
    }

    async fn run(
        &self,
        mut report: ResampleReport,
        input_table: &str,
        output_table: &str,
        window: TimeWindow,
    ) -> Result<ResampleReport> {
        let ticks = report.series.predicate();
        report.window = Some(window);

        for chunk in window.chunks(self.chunk_size)? {
            if self.stop.is_stopped() {
                warn!(series = %report.series, chunk = %chunk, "resample cancelled");
                report.cancelled = true;
                break;
            }
            report.chunks += 1;

            let rows = self.store.select_ticks(input_table, &ticks, &chunk).await?;
            if rows.is_empty() {
                debug!(series = %report.series, chunk = %chunk, "no ticks in chunk");
                report.empty_chunks += 1;
                continue;
            }

            let bars = aggregate(&rows, &report.series, report.frequency);
            report.bars_written += self.store.write_bars(output_table, &bars).await?;
        }

        info!(
            series = %report.series,
            frequency = %report.frequency,
            window = %window,
            chunks = report.chunks,
            empty_chunks = report.empty_chunks,
            bars = report.bars_written,
            "resampled"
        );
        Ok(report)
    }

    /// Returns the bar-aligned window covering every tick of `series`.
    async fn series_window(
        &self,
        series: &SeriesKey,
        input_table: &str,
        frequency: Frequency,
    ) -> Result<Option<TimeWindow>> {
        let Some((first, last)) = self
            .store
            .time_bounds(input_table, &series.predicate())
            .await?
        else {
            return Ok(None);
        };
        align(&TimeWindow::covering(first, last), frequency).map(Some)
    }

    fn check_chunk_size(&self, frequency: Frequency) -> Result<()> {
        let chunk_ms = self.chunk_size.num_milliseconds();
        if chunk_ms <= 0 || chunk_ms % frequency.milliseconds() != 0 {
            return Err(ResampleError::ChunkSize {
                chunk: self.chunk_size,
                frequency,
            });
        }
        Ok(())
    }
}

/// Selects the bars of one series at one frequency.
fn bar_predicate(series: &SeriesKey, frequency: Frequency) -> Predicate {
    series.predicate().and_eq(Tag::Frequency, frequency.as_str())
}

/// Widens `window` to whole bars.
fn align(window: &TimeWindow, frequency: Frequency) -> Result<TimeWindow> {
    let start = frequency.bucket_start(window.start);
    let end = if frequency.is_aligned(window.end) {
        window.end
    } else {
        frequency.bucket_start(window.end) + frequency.duration()
    };
    Ok(TimeWindow::new(start, end)?)
}

/// Returns the window to recompute when existing bars line up with the
/// ticks, starting at the last stored bar.
fn resume_window(
    full: &TimeWindow,
    first_bar: DateTime<Utc>,
    last_bar: DateTime<Utc>,
) -> Option<TimeWindow> {
    if first_bar != full.start {
        return None;
    }
    full.starting_at(last_bar).ok()
}
