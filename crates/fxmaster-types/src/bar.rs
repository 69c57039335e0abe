//! OHLC bar data structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Frequency, SeriesKey};

/// OHLC bar of mid prices for one series and frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open time, aligned to the frequency boundary.
    pub period_start: DateTime<Utc>,
    /// Six letter currency pair.
    pub symbol: String,
    /// Data provider.
    pub provider: String,
    /// Bar width.
    pub frequency: Frequency,
    /// Mid price of the first tick.
    pub open: f64,
    /// Highest mid price.
    pub high: f64,
    /// Lowest mid price.
    pub low: f64,
    /// Mid price of the last tick.
    pub close: f64,
    /// Number of ticks aggregated into the bar.
    #[serde(default)]
    pub tick_count: u32,
}

impl Bar {
    /// Returns the series this bar belongs to.
    #[must_use]
    pub fn series(&self) -> SeriesKey {
        SeriesKey::new(&self.symbol, &self.provider)
    }

    /// Returns the end of the bar period (exclusive).
    #[must_use]
    pub fn period_end(&self) -> DateTime<Utc> {
        self.period_start + self.frequency.duration()
    }

    /// Returns the price range (high - low).
    #[must_use]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Returns true if this is a bullish bar.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}
