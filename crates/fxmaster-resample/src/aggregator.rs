//! Streaming tick-to-bar aggregation.

use chrono::{DateTime, Utc};
use fxmaster_types::{Bar, Frequency, SeriesKey, TickRecord};

/// Streaming mid-price aggregator for one series.
///
/// Ticks must arrive in time order. Bars are aligned to the Unix epoch and
/// a bucket with no ticks produces no bar.
#[derive(Debug)]
pub struct BarAggregator {
    series: SeriesKey,
    frequency: Frequency,
    current_bar: Option<BarBuilder>,
}

impl BarAggregator {
    /// Creates a new aggregator for `series` at `frequency`.
    #[must_use]
    pub const fn new(series: SeriesKey, frequency: Frequency) -> Self {
        Self {
            series,
            frequency,
            current_bar: None,
        }
    }

    /// Returns the frequency being aggregated to.
    #[must_use]
    pub const fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Processes a tick, potentially emitting a completed bar.
    ///
    /// Returns `Some(bar)` when this tick starts a new bucket.
    pub fn process(&mut self, tick: &TickRecord) -> Option<Bar> {
        let bar_start = self.frequency.bucket_start(tick.timestamp);

        match self.current_bar.take() {
            Some(mut builder) if builder.period_start == bar_start => {
                builder.update(tick.mid());
                self.current_bar = Some(builder);
                None
            }
            Some(builder) => {
                let completed = self.build(builder);
                self.current_bar = Some(BarBuilder::new(bar_start, tick.mid()));
                Some(completed)
            }
            None => {
                self.current_bar = Some(BarBuilder::new(bar_start, tick.mid()));
                None
            }
        }
    }

    /// Finishes aggregation, returning any remaining partial bar.
    #[must_use]
    pub fn finish(mut self) -> Option<Bar> {
        self.current_bar.take().map(|b| self.build(b))
    }

    fn build(&self, builder: BarBuilder) -> Bar {
        Bar {
            period_start: builder.period_start,
            symbol: self.series.symbol.clone(),
            provider: self.series.provider.clone(),
            frequency: self.frequency,
            open: builder.open,
            high: builder.high,
            low: builder.low,
            close: builder.close,
            tick_count: builder.tick_count,
        }
    }
}

#[derive(Debug)]
struct BarBuilder {
    period_start: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    tick_count: u32,
}

impl BarBuilder {
    const fn new(period_start: DateTime<Utc>, mid: f64) -> Self {
        Self {
            period_start,
            open: mid,
            high: mid,
            low: mid,
            close: mid,
            tick_count: 1,
        }
    }

    fn update(&mut self, mid: f64) {
        self.high = self.high.max(mid);
        self.low = self.low.min(mid);
        self.close = mid;
        self.tick_count += 1;
    }
}

/// Aggregates time-ordered ticks into bars.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use fxmaster_resample::aggregate;
/// use fxmaster_types::{Frequency, SeriesKey, TickRecord};
///
/// let t0 = Utc.with_ymd_and_hms(2016, 1, 4, 9, 0, 5).unwrap();
/// let ticks = vec![TickRecord::new(t0, "EURUSD", "fxcm", 1.10, 1.11)];
/// let bars = aggregate(&ticks, &SeriesKey::new("EURUSD", "fxcm"), Frequency::Minute1);
/// assert_eq!(bars.len(), 1);
/// assert_eq!(bars[0].period_start, Utc.with_ymd_and_hms(2016, 1, 4, 9, 0, 0).unwrap());
/// ```
#[must_use]
pub fn aggregate(ticks: &[TickRecord], series: &SeriesKey, frequency: Frequency) -> Vec<Bar> {
    let mut aggregator = BarAggregator::new(series.clone(), frequency);
    let mut bars: Vec<Bar> = ticks.iter().filter_map(|t| aggregator.process(t)).collect();
    bars.extend(aggregator.finish());
    bars
}
