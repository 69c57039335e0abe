//! Historic tick playback for fxmaster backtests.
//!
//! - [`HistoricPlayback`] - Pull cursor over one streamed, time-ordered query
//! - [`OrderGuard`] - Per-symbol ordering and range checks
//! - [`TickFeed`] - Pushes [`MarketEvent`]s onto a queue for a backtest driver

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fxmaster/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod engine;
mod error;
mod event;
mod feed;

pub use engine::{HistoricPlayback, OrderGuard, PlaybackState};
pub use error::{PlaybackError, Result};
pub use event::{MarketEvent, PlaybackEvent};
pub use feed::{EventReceiver, TickFeed};
