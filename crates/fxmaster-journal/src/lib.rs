//! Load journal for the fxmaster bulk loader.
//!
//! Every bulk run is recorded as a JSON document so a restarted run can
//! find the bucket that was being modified when the previous one stopped:
//!
//! - [`LoadRun`] - One loader invocation and its per-bucket results
//! - [`JournalStore`] - Persistent run storage
//! - [`RunTracker`] - Checkpoints each bucket transition to disk

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fxmaster/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod journal;
mod run;
mod tracker;

pub use journal::{JournalError, JournalStore, Result};
pub use run::{BucketResult, LoadRun, RunId, RunStatus};
pub use tracker::RunTracker;
