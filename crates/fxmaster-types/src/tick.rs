//! Tick data representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored tick: one bid/ask quote for a symbol from a data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    /// Timestamp of the tick (UTC, millisecond resolution).
    pub timestamp: DateTime<Utc>,
    /// Six letter currency pair (e.g., "EURUSD").
    pub symbol: String,
    /// Data provider (e.g., "fxcm").
    pub provider: String,
    /// Bid price.
    pub bid: f64,
    /// Ask (offer) price.
    pub ask: f64,
}

impl TickRecord {
    /// Creates a new tick record.
    #[must_use]
    pub fn new(
        timestamp: DateTime<Utc>,
        symbol: impl Into<String>,
        provider: impl Into<String>,
        bid: f64,
        ask: f64,
    ) -> Self {
        Self {
            timestamp,
            symbol: symbol.into(),
            provider: provider.into(),
            bid,
            ask,
        }
    }

    /// Returns the mid price (average of bid and ask).
    #[must_use]
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    /// Returns the spread (ask - bid).
    #[must_use]
    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }

    /// Drops the symbol and provider tags.
    #[must_use]
    pub const fn quote(&self) -> Quote {
        Quote::new(self.timestamp, self.bid, self.ask)
    }
}

/// A tick row as decoded from a source file, before it is tagged.
///
/// Source rows carry no symbol or provider; both come from the file name
/// and the load configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Timestamp of the tick (UTC).
    pub timestamp: DateTime<Utc>,
    /// Bid price.
    pub bid: f64,
    /// Ask price.
    pub ask: f64,
}

impl Quote {
    /// Creates a new quote.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, bid: f64, ask: f64) -> Self {
        Self {
            timestamp,
            bid,
            ask,
        }
    }

    /// Returns the mid price (average of bid and ask).
    #[must_use]
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    /// Attaches series tags, producing a full tick record.
    #[must_use]
    pub fn tag(self, symbol: impl Into<String>, provider: impl Into<String>) -> TickRecord {
        TickRecord::new(self.timestamp, symbol, provider, self.bid, self.ask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    #[test]
    fn test_tick_mid_price() {
        let tick = TickRecord::new(Utc::now(), "EURUSD", "fxcm", 1.1000, 1.1001);
        assert_relative_eq!(tick.mid(), 1.10005, epsilon = 1e-10);
    }

    #[test]
    fn test_tick_spread() {
        let tick = TickRecord::new(Utc::now(), "EURUSD", "fxcm", 1.1000, 1.1001);
        assert_relative_eq!(tick.spread(), 0.0001, epsilon = 1e-10);
    }

    #[test]
    fn test_quote_tag_keeps_prices() {
        let ts = Utc.with_ymd_and_hms(2015, 1, 4, 22, 0, 1).unwrap();
        let quote = Quote::new(ts, 1.07601, 1.07628);
        let tick = quote.tag("EURUSD", "fxcm");

        assert_eq!(tick.timestamp, ts);
        assert_eq!(tick.symbol, "EURUSD");
        assert_eq!(tick.provider, "fxcm");
        assert_eq!(tick.quote(), quote);
    }
}
