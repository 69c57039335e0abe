//! Securities master for FX tick data.
//!
//! This is a facade crate that re-exports functionality from the fxmaster
//! workspace crates and adds the process-wide [`Settings`].
//!
//! # Quick Start
//!
//! ```ignore
//! use fxmaster_lib::prelude::*;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::resolve(None)?;
//!     let store = settings.store.open()?;
//!     let journal = settings.journal.open()?;
//!
//!     let loader = BulkLoader::new(store.clone(), journal, settings.ingest.load_options());
//!     let report = loader.load(Path::new("/data/ticks")).await?;
//!     println!("{report}");
//!
//!     let resampler = Resampler::new(store);
//!     resampler.resample_all("fx_ticks", "fx", Frequency::Minute1).await?;
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fxmaster/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;

pub use config::{ConfigError, Settings, StoreBackend};

// Re-export core types
pub use fxmaster_types::*;

// Re-export storage
pub use fxmaster_store::{
    InfluxConfig, InfluxStore, MemoryStore, StoreError, TickStore, TickStream, query,
};

// Re-export ingestion
pub use fxmaster_ingest::{
    BucketProgress, BulkLoader, Catalog, CatalogError, DecodeError, IngestError, LoadOptions,
    LoadReport, ParseError, ValidationMode, Validator, parse_timestamp,
};

// Re-export the load journal
pub use fxmaster_journal::{
    BucketResult, JournalError, JournalStore, LoadRun, RunId, RunStatus, RunTracker,
};

// Re-export resampling
pub use fxmaster_resample::{
    BarAggregator, ResampleError, ResampleMode, ResampleReport, Resampler, aggregate,
};

// Re-export playback
pub use fxmaster_playback::{
    EventReceiver, HistoricPlayback, MarketEvent, PlaybackError, PlaybackEvent, PlaybackState,
    TickFeed,
};

/// Prelude module for convenient imports.
///
/// ```
/// use fxmaster_lib::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::Settings;

    pub use fxmaster_types::{
        Bar, Frequency, Predicate, Quote, SeriesKey, SourceFile, StopFlag, Tag, TagSet,
        TickRecord, TimeWindow, ValidationOutcome, ValidationStatus,
    };

    pub use fxmaster_store::{InfluxStore, MemoryStore, TickStore};

    pub use fxmaster_ingest::{BulkLoader, Catalog, LoadOptions, LoadReport, Validator};

    pub use fxmaster_journal::JournalStore;

    pub use fxmaster_resample::Resampler;

    pub use fxmaster_playback::{HistoricPlayback, MarketEvent, TickFeed};
}
