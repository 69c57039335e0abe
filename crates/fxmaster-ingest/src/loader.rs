//! Sequential delete-then-reinsert bulk loading.

use fxmaster_journal::{BucketResult, JournalStore, LoadRun, RunId, RunStatus, RunTracker};
use fxmaster_store::TickStore;
use fxmaster_types::{
    Predicate, SOURCE_EXTENSION, SourceFile, StopFlag, Tag, TagSet, ValidationOutcome,
    ValidationStatus, parse_file_name,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::decompress::decode_file;
use crate::validator::{DEFAULT_TOLERANCE, Validator};
use crate::{Catalog, DecodeError, IngestError, Result};

/// How buckets are validated before loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Trust current cached validation rows.
    Fast,
    /// Count every source file and query the store.
    #[default]
    Full,
}

impl std::str::FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "full" => Ok(Self::Full),
            _ => Err(format!("Unknown validation mode: {s}")),
        }
    }
}

/// Bulk load configuration.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Provider tag written with every tick.
    pub provider: String,
    /// Destination tick table.
    pub table: String,
    /// Validation cache table, if any.
    pub validation_table: Option<String>,
    /// Largest row difference still accepted.
    pub tolerance: u64,
    /// Reload every bucket regardless of its stored state.
    pub overwrite: bool,
    /// Pre-validation mode.
    pub validation_mode: ValidationMode,
}

impl LoadOptions {
    /// Creates options for `provider` into `table` with default settings.
    pub fn new(provider: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            table: table.into(),
            validation_table: None,
            tolerance: DEFAULT_TOLERANCE,
            overwrite: false,
            validation_mode: ValidationMode::default(),
        }
    }
}

/// Progress notification sent after each bucket.
#[derive(Debug, Clone)]
pub struct BucketProgress {
    /// Zero-based position of the bucket in the catalog.
    pub index: usize,
    /// Number of buckets in the catalog.
    pub total: usize,
    /// File id of the bucket.
    pub file_id: String,
    /// How the bucket left the loader.
    pub result: BucketResult,
}

/// Summary of one bulk run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Journal id of the run.
    pub run_id: RunId,
    /// Final status.
    pub status: RunStatus,
    /// File ids loaded.
    pub loaded: Vec<String>,
    /// File ids skipped as already satisfactory.
    pub skipped: Vec<String>,
    /// File ids that failed.
    pub failed: Vec<String>,
    /// Bucket left in progress by a previous run and cleared on start.
    pub resumed: Option<String>,
}

impl LoadReport {
    fn from_run(run: LoadRun, resumed: Option<String>) -> Self {
        Self {
            run_id: run.id,
            status: run.status,
            loaded: run.loaded,
            skipped: run.skipped,
            failed: run.failed,
            resumed,
        }
    }
}

impl std::fmt::Display for LoadReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} loaded, {} skipped, {} failed",
            self.status,
            self.loaded.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}

/// Loads a catalog of source files into a tick table, one bucket at a time.
pub struct BulkLoader {
    store: Arc<dyn TickStore>,
    journal: JournalStore,
    validator: Validator,
    options: LoadOptions,
    stop: StopFlag,
}

impl std::fmt::Debug for BulkLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkLoader")
            .field("journal", &self.journal)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl BulkLoader {
    /// Creates a loader.
    pub fn new(store: Arc<dyn TickStore>, journal: JournalStore, options: LoadOptions) -> Self {
        let mut validator = Validator::new(Arc::clone(&store), &options.table, options.tolerance);
        if let Some(cache) = &options.validation_table {
            validator = validator.with_cache(cache);
        }
        Self {
            store,
            journal,
            validator,
            options,
            stop: StopFlag::new(),
        }
    }

    /// Uses `stop` to cancel the run between buckets.
    #[must_use]
    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    /// Returns the options.
    #[must_use]
    pub const fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Loads every source file under `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store, the journal, or the directory walk
    /// fails. Malformed files only fail their own bucket.
    pub async fn load(&self, dir: &Path) -> Result<LoadReport> {
        self.load_with_progress(dir, |_| {}).await
    }

    /// Loads every source file under `dir`, reporting each bucket to
    /// `on_bucket`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store, the journal, or the directory walk
    /// fails. Malformed files only fail their own bucket.
    pub async fn load_with_progress<F>(&self, dir: &Path, mut on_bucket: F) -> Result<LoadReport>
    where
        F: FnMut(&BucketProgress),
    {
        let opts = &self.options;
        let interrupted = self.journal.interrupted_bucket(&opts.table, &opts.provider)?;

        let mut run = LoadRun::new(dir, &opts.table, &opts.provider);
        if let Some(file_id) = &interrupted {
            run.begin_bucket(file_id);
        }
        let mut tracker = RunTracker::start(self.journal.clone(), run)?;
        info!(
            run_id = %tracker.run().id,
            dir = %dir.display(),
            table = %opts.table,
            provider = %opts.provider,
            "bulk load started"
        );

        if let Some(file_id) = &interrupted
            && let Err(e) = self.clear_interrupted(&mut tracker, file_id).await
        {
            tracker.fail(e.to_string())?;
            return Err(e);
        }

        let files = match Catalog::new(dir).files() {
            Ok(files) => files,
            Err(e) => {
                tracker.fail(e.to_string())?;
                return Err(e.into());
            }
        };

        let total = files.len();
        for (index, file) in files.iter().enumerate() {
            if self.stop.is_stopped() {
                warn!(visited = index, total, "bulk load cancelled");
                let run = tracker.cancel()?;
                return Ok(LoadReport::from_run(run, interrupted));
            }

            let result = match self.load_bucket(&mut tracker, file).await {
                Ok(result) => result,
                Err(e) => {
                    error!(file_id = %file.file_id(), error = %e, "bulk load failed");
                    tracker.fail(e.to_string())?;
                    return Err(e);
                }
            };
            on_bucket(&BucketProgress {
                index,
                total,
                file_id: file.file_id(),
                result,
            });
        }

        let report = LoadReport::from_run(tracker.complete()?, interrupted);
        info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "bulk load finished"
        );
        Ok(report)
    }

    /// Deletes whatever a previous run left of the bucket it was modifying.
    ///
    /// The marker was carried into this run before it started, so a crash
    /// here is cleared again on the next start. The bucket then reloads as
    /// absent.
    async fn clear_interrupted(&self, tracker: &mut RunTracker, file_id: &str) -> Result<()> {
        warn!(file_id, "clearing bucket left in progress by a previous run");
        let tags = bucket_tags(file_id, &self.options.provider);
        self.store
            .delete(&self.options.table, &Predicate::exact(&tags))
            .await?;
        tracker.release_bucket()?;
        Ok(())
    }

    async fn load_bucket(
        &self,
        tracker: &mut RunTracker,
        file: &SourceFile,
    ) -> Result<BucketResult> {
        let file_id = file.file_id();
        let provider = &self.options.provider;

        let status = if self.options.overwrite {
            None
        } else {
            match self.pre_validate(file).await? {
                Ok(outcome) if outcome.is_satisfactory() => {
                    info!(file_id = %file_id, status = %outcome.status, "skipping bucket");
                    tracker.finish_bucket(&file_id, BucketResult::Skipped)?;
                    return Ok(BucketResult::Skipped);
                }
                Ok(outcome) => Some(outcome.status),
                Err(e) => return fail_bucket(tracker, &file_id, e),
            }
        };

        let quotes = match decode_file(file).await? {
            Ok(quotes) => quotes,
            Err(e) => return fail_bucket(tracker, &file_id, e),
        };

        let tags = file.tags(provider);
        tracker.begin_bucket(&file_id)?;
        if status != Some(ValidationStatus::Absent) {
            debug!(file_id = %file_id, "deleting bucket");
            self.store
                .delete(&self.options.table, &Predicate::exact(&tags))
                .await?;
        }
        self.store
            .write_ticks(&self.options.table, &tags, &quotes)
            .await?;

        let outcome = self
            .validator
            .validate_counted(file, provider, quotes.len() as u64)
            .await?;
        let result = post_result(&outcome);
        if result == BucketResult::Loaded {
            info!(file_id = %file_id, rows = quotes.len(), status = %outcome.status, "bucket loaded");
        } else {
            error!(
                file_id = %file_id,
                difference = outcome.difference,
                "bucket failed post-validation"
            );
        }
        tracker.finish_bucket(&file_id, result)?;
        Ok(result)
    }

    async fn pre_validate(
        &self,
        file: &SourceFile,
    ) -> Result<std::result::Result<ValidationOutcome, DecodeError>> {
        match self.options.validation_mode {
            ValidationMode::Fast => {
                self.validator
                    .validate_fast(file, &self.options.provider)
                    .await
            }
            ValidationMode::Full => self.validator.validate(file, &self.options.provider).await,
        }
    }
}

fn fail_bucket(
    tracker: &mut RunTracker,
    file_id: &str,
    source: DecodeError,
) -> Result<BucketResult> {
    let error = IngestError::Decode {
        file_id: file_id.to_string(),
        source,
    };
    error!(error = %error, "bucket failed");
    tracker.finish_bucket(file_id, BucketResult::Failed)?;
    Ok(BucketResult::Failed)
}

const fn post_result(outcome: &ValidationOutcome) -> BucketResult {
    if outcome.is_satisfactory() {
        BucketResult::Loaded
    } else {
        BucketResult::Failed
    }
}

/// Rebuilds the exact tag set of a bucket from its file id.
fn bucket_tags(file_id: &str, provider: &str) -> TagSet {
    let mut tags = TagSet::new()
        .with(Tag::Provider, provider)
        .with(Tag::Filename, file_id);
    if let Some((symbol, _, _)) = parse_file_name(&format!("{file_id}{SOURCE_EXTENSION}")) {
        tags.insert(Tag::Symbol, symbol);
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompress::decode_source;
    use crate::decompress::fixtures::{tick_rows, write_gz};
    use fxmaster_store::MemoryStore;
    use tempfile::TempDir;

    const TABLE: &str = "fx_ticks";

    struct Fixture {
        _dir: TempDir,
        source: std::path::PathBuf,
        journal: JournalStore,
        store: MemoryStore,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let source = dir.path().join("source");
            write_gz(&source.join("AUDCAD/2015"), "AUDCAD_2015_1.csv.gz", &tick_rows(100));
            write_gz(&source.join("EURUSD/2016"), "EURUSD_2016_5.csv.gz", &tick_rows(40));
            let journal = JournalStore::new(dir.path().join("journal")).unwrap();
            Self {
                _dir: dir,
                source,
                journal,
                store: MemoryStore::new(),
            }
        }

        fn loader(&self, options: LoadOptions) -> BulkLoader {
            BulkLoader::new(Arc::new(self.store.clone()), self.journal.clone(), options)
        }

        fn file(&self, id: &str) -> SourceFile {
            let (symbol, year, _) = parse_file_name(&format!("{id}.csv.gz")).unwrap();
            SourceFile::from_path(
                self.source
                    .join(symbol)
                    .join(year.to_string())
                    .join(format!("{id}.csv.gz")),
            )
            .unwrap()
        }

        async fn stored(&self, id: &str) -> u64 {
            let tags = self.file(id).tags("fxcm");
            self.store.count(TABLE, &Predicate::exact(&tags)).await.unwrap()
        }
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let fx = Fixture::new();
        let loader = fx.loader(LoadOptions::new("fxcm", TABLE));

        let report = loader.load(&fx.source).await.unwrap();
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.loaded, vec!["AUDCAD_2015_1", "EURUSD_2016_5"]);
        assert_eq!(fx.stored("AUDCAD_2015_1").await, 100);
        assert_eq!(fx.stored("EURUSD_2016_5").await, 40);

        let report = loader.load(&fx.source).await.unwrap();
        assert!(report.loaded.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(fx.store.row_count(TABLE), 140);
    }

    #[tokio::test]
    async fn test_malformed_file_fails_only_its_bucket() {
        let fx = Fixture::new();
        let bad = format!("{}\n01/04/2015 22:00:01.587,0.9\n", tick_rows(3));
        write_gz(&fx.source.join("GBPUSD/2015"), "GBPUSD_2015_2.csv.gz", &bad);

        let report = fx
            .loader(LoadOptions::new("fxcm", TABLE))
            .load(&fx.source)
            .await
            .unwrap();
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.failed, vec!["GBPUSD_2015_2"]);
        assert_eq!(report.loaded.len(), 2);
        assert_eq!(fx.store.row_count(TABLE), 140);
    }

    #[tokio::test]
    async fn test_unacceptable_bucket_is_replaced() {
        let fx = Fixture::new();
        let file = fx.file("AUDCAD_2015_1");
        let partial = decode_source(&tick_rows(30)).unwrap();
        fx.store
            .write_ticks(TABLE, &file.tags("fxcm"), &partial)
            .await
            .unwrap();
        fx.store
            .write_ticks(TABLE, &file.tags("oanda"), &partial)
            .await
            .unwrap();

        let report = fx
            .loader(LoadOptions::new("fxcm", TABLE))
            .load(&fx.source)
            .await
            .unwrap();
        assert!(report.loaded.contains(&"AUDCAD_2015_1".to_string()));
        assert_eq!(fx.stored("AUDCAD_2015_1").await, 100);

        let oanda = fx
            .store
            .count(TABLE, &Predicate::exact(&file.tags("oanda")))
            .await
            .unwrap();
        assert_eq!(oanda, 30);
    }

    #[tokio::test]
    async fn test_interrupted_bucket_is_reloaded() {
        let fx = Fixture::new();
        let loader = fx.loader(LoadOptions::new("fxcm", TABLE));
        loader.load(&fx.source).await.unwrap();

        let mut crashed = LoadRun::new(&fx.source, TABLE, "fxcm");
        crashed.begin_bucket("EURUSD_2016_5");
        fx.journal.save(&crashed).unwrap();

        let report = loader.load(&fx.source).await.unwrap();
        assert_eq!(report.resumed.as_deref(), Some("EURUSD_2016_5"));
        assert_eq!(report.loaded, vec!["EURUSD_2016_5"]);
        assert_eq!(report.skipped, vec!["AUDCAD_2015_1"]);
        assert_eq!(fx.stored("EURUSD_2016_5").await, 40);
        assert!(
            fx.journal
                .interrupted_bucket(TABLE, "fxcm")
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_overwrite_reloads_everything() {
        let fx = Fixture::new();
        fx.loader(LoadOptions::new("fxcm", TABLE))
            .load(&fx.source)
            .await
            .unwrap();

        let mut options = LoadOptions::new("fxcm", TABLE);
        options.overwrite = true;
        let report = fx.loader(options).load(&fx.source).await.unwrap();
        assert_eq!(report.loaded.len(), 2);
        assert_eq!(fx.store.row_count(TABLE), 140);
    }

    #[tokio::test]
    async fn test_fast_mode_uses_cache() {
        let fx = Fixture::new();
        let mut options = LoadOptions::new("fxcm", TABLE);
        options.validation_table = Some("fx_validation".to_string());
        options.validation_mode = ValidationMode::Fast;
        let loader = fx.loader(options);
        loader.load(&fx.source).await.unwrap();

        // Cached rows are current, so the source files are not read again.
        write_gz(&fx.source.join("AUDCAD/2015"), "AUDCAD_2015_1.csv.gz", "garbage");
        let report = loader.load(&fx.source).await.unwrap();
        assert_eq!(report.skipped.len(), 2);
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn test_stop_flag_cancels_run() {
        let fx = Fixture::new();
        let stop = StopFlag::new();
        stop.stop();

        let report = fx
            .loader(LoadOptions::new("fxcm", TABLE))
            .with_stop_flag(stop)
            .load(&fx.source)
            .await
            .unwrap();
        assert_eq!(report.status, RunStatus::Cancelled);
        assert_eq!(fx.store.row_count(TABLE), 0);
        assert_eq!(
            fx.journal.load(report.run_id).unwrap().status,
            RunStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_progress_reports_every_bucket() {
        let fx = Fixture::new();
        let mut seen = Vec::new();
        fx.loader(LoadOptions::new("fxcm", TABLE))
            .load_with_progress(&fx.source, |p| seen.push((p.index, p.total, p.result)))
            .await
            .unwrap();
        assert_eq!(
            seen,
            vec![(0, 2, BucketResult::Loaded), (1, 2, BucketResult::Loaded)]
        );
    }

    #[test]
    fn test_bucket_tags_from_file_id() {
        let tags = bucket_tags("EURUSD_2016_5", "fxcm");
        assert_eq!(tags.get(Tag::Symbol), Some("EURUSD"));
        assert_eq!(tags.get(Tag::Filename), Some("EURUSD_2016_5"));
        assert_eq!(bucket_tags("unknown", "fxcm").len(), 2);
    }

    #[test]
    fn test_report_display() {
        let mut run = LoadRun::new("/d", TABLE, "fxcm");
        run.finish_bucket("AUDCAD_2015_1", BucketResult::Loaded);
        run.mark_completed();
        let report = LoadReport::from_run(run, None);
        assert_eq!(report.to_string(), "completed: 1 loaded, 0 skipped, 0 failed");
    }
}
