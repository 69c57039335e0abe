//! Events produced by playback.

use chrono::{DateTime, Utc};
use fxmaster_types::TickRecord;
use serde::{Deserialize, Serialize};

/// One replayed tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackEvent {
    /// Tick time.
    pub timestamp: DateTime<Utc>,
    /// Six letter currency pair.
    pub symbol: String,
    /// Bid price.
    pub bid: f64,
    /// Ask price.
    pub ask: f64,
    /// Data provider.
    pub provider: String,
}

impl PlaybackEvent {
    /// Returns the mid price.
    #[must_use]
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }
}

impl From<TickRecord> for PlaybackEvent {
    fn from(tick: TickRecord) -> Self {
        Self {
            timestamp: tick.timestamp,
            symbol: tick.symbol,
            bid: tick.bid,
            ask: tick.ask,
            provider: tick.provider,
        }
    }
}

/// Event delivered to a backtest driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MarketEvent {
    /// A price update.
    Tick(PlaybackEvent),
}

impl MarketEvent {
    /// Returns the event time.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Tick(event) => event.timestamp,
        }
    }
}
