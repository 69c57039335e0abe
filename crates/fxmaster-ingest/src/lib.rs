//! Source catalog, validation and bulk loading for fxmaster.
//!
//! This crate moves weekly tick files into a [`TickStore`](fxmaster_store::TickStore):
//!
//! - [`Catalog`] - Lazy, ordered walk over a source directory tree
//! - [`parse_timestamp`] - Fixed-offset timestamp parser
//! - [`decode_source`] - Gzip CSV decoding with row-count checking
//! - [`Validator`] - Row-count reconciliation, with an optional cache
//! - [`BulkLoader`] - Sequential delete-then-reinsert loading with resume

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fxmaster/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod catalog;
mod decompress;
mod error;
mod loader;
mod parse;
mod validator;

pub use catalog::{Catalog, CatalogWalk, diff, loaded_ids};
pub use decompress::{count_data_rows, count_rows, decode_file, decode_source, read_source};
pub use error::{CatalogError, DecodeError, IngestError, ParseError, Result};
pub use loader::{BucketProgress, BulkLoader, LoadOptions, LoadReport, ValidationMode};
pub use parse::{TIMESTAMP_LEN, is_data_line, parse_line, parse_timestamp};
pub use validator::{DEFAULT_TOLERANCE, Validator};
