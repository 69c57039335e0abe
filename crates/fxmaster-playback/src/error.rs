//! Error types for playback.

use chrono::{DateTime, Utc};
use fxmaster_store::StoreError;
use fxmaster_types::TimeWindow;
use thiserror::Error;

use crate::PlaybackState;

/// Result type alias for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Errors that can occur during playback.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// Store unavailable or query rejected.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No symbol was requested.
    #[error("No symbols requested")]
    NoSymbols,

    /// Operation not allowed in the current state.
    #[error("Playback is {0}")]
    InvalidState(PlaybackState),

    /// A tick arrived earlier than the previous tick of its symbol.
    #[error("{symbol}: tick at {timestamp} follows tick at {previous}")]
    OutOfOrder {
        /// Symbol of the tick.
        symbol: String,
        /// Timestamp of the previous tick.
        previous: DateTime<Utc>,
        /// Timestamp of the offending tick.
        timestamp: DateTime<Utc>,
    },

    /// A tick lies outside the requested window.
    #[error("Tick at {timestamp} outside {window}")]
    OutOfRange {
        /// Timestamp of the offending tick.
        timestamp: DateTime<Utc>,
        /// The requested window.
        window: TimeWindow,
    },

    /// A tick belongs to a series that was not requested.
    #[error("Unexpected series {symbol}/{provider}")]
    UnexpectedSeries {
        /// Symbol of the tick.
        symbol: String,
        /// Provider of the tick.
        provider: String,
    },

    /// The event receiver was dropped.
    #[error("Event queue closed")]
    QueueClosed,
}
