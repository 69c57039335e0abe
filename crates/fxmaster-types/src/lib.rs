//! Core types for the fxmaster tick securities master.
//!
//! This crate provides the fundamental data structures used throughout fxmaster:
//!
//! - [`TickRecord`] - A stored tick tagged with its symbol and provider
//! - [`Quote`] - An untagged tick row as decoded from a source file
//! - [`Bar`] - An OHLC bar derived from mid prices
//! - [`Frequency`] - Bar width, aligned to absolute time
//! - [`TimeWindow`] - Half-open time range with chunk iteration
//! - [`SourceFile`] - A weekly tick file identified by its name
//! - [`Predicate`] - Tag predicate builder used by every store query
//! - [`ValidationOutcome`] - Row-count reconciliation result

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fxmaster/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bar;
mod frequency;
mod predicate;
mod series;
mod source_file;
mod stop;
mod tick;
mod validation;
mod window;

pub use bar::Bar;
pub use frequency::{Frequency, FrequencyParseError};
pub use predicate::{Joiner, Predicate, Tag, TagFilter, TagSet};
pub use series::SeriesKey;
pub use source_file::{SOURCE_EXTENSION, SourceFile, parse_file_name};
pub use stop::StopFlag;
pub use tick::{Quote, TickRecord};
pub use validation::{ValidationOutcome, ValidationStatus};
pub use window::{ChunkIterator, TimeWindow, WindowError, truncate_to_minute};
