//! Tick and bar storage for fxmaster.
//!
//! This crate provides the store capability used by every pipeline stage:
//!
//! - [`TickStore`] - Async trait: tagged writes, predicate selects, counts, deletes
//! - [`MemoryStore`] - In-process implementation with the database's upsert semantics
//! - [`InfluxStore`] - InfluxDB 1.x HTTP implementation (line protocol + InfluxQL)
//! - [`query`] - InfluxQL and line protocol rendering

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fxmaster/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod influx;
mod memory;
pub mod query;
mod response;
mod store;

pub use error::{Result, StoreError};
pub use influx::{InfluxConfig, InfluxStore};
pub use memory::MemoryStore;
pub use store::{TickStore, TickStream};
