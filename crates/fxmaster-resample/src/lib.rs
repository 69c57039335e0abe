//! Tick to OHLC bar resampling for fxmaster.
//!
//! - [`BarAggregator`] - Streaming mid-price OHLC aggregation
//! - [`Resampler`] - Chunked, resumable resampling of stored series

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fxmaster/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod aggregator;
mod error;
mod resampler;

pub use aggregator::{BarAggregator, aggregate};
pub use error::{ResampleError, Result};
pub use resampler::{DEFAULT_CHUNK_HOURS, ResampleMode, ResampleReport, Resampler};
