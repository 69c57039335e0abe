//! Load run records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for a load run.
pub type RunId = Uuid;

/// Status of a load run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Run is in progress, or its process died.
    #[default]
    Running,
    /// Every bucket was visited.
    Completed,
    /// Run stopped on a store or journal error.
    Failed,
    /// Run was stopped by the user.
    Cancelled,
}

impl RunStatus {
    /// Returns true if the run is in a terminal state.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns the status as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a bucket left the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketResult {
    /// Reloaded and post-validated.
    Loaded,
    /// Already satisfactory in the store.
    Skipped,
    /// Decode or post-validation failed.
    Failed,
}

/// One invocation of the bulk loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadRun {
    /// Unique identifier for this run.
    pub id: RunId,
    /// Timestamp when the run was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp when the run reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
    /// Current status.
    pub status: RunStatus,
    /// Directory the catalog was built from.
    pub source_dir: PathBuf,
    /// Destination tick table.
    pub table: String,
    /// Provider tag written with every tick.
    pub provider: String,
    /// File id of the bucket being modified, if any.
    ///
    /// Set before the first destructive store operation on a bucket and
    /// cleared once the bucket is post-validated.
    pub in_progress: Option<String>,
    /// File ids loaded by this run.
    #[serde(default)]
    pub loaded: Vec<String>,
    /// File ids skipped as already satisfactory.
    #[serde(default)]
    pub skipped: Vec<String>,
    /// File ids that failed.
    #[serde(default)]
    pub failed: Vec<String>,
    /// Error that ended the run, if any.
    pub error: Option<String>,
}

impl LoadRun {
    /// Creates a new run in the running state.
    #[must_use]
    pub fn new(
        source_dir: impl Into<PathBuf>,
        table: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Running,
            source_dir: source_dir.into(),
            table: table.into(),
            provider: provider.into(),
            in_progress: None,
            loaded: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            error: None,
        }
    }

    /// Returns true if the run is in a terminal state.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    /// Returns true if this run targets `table` for `provider`.
    #[must_use]
    pub fn targets(&self, table: &str, provider: &str) -> bool {
        self.table == table && self.provider == provider
    }

    /// Records that `file_id` is about to be modified.
    pub fn begin_bucket(&mut self, file_id: &str) {
        self.in_progress = Some(file_id.to_string());
    }

    /// Records the result of a bucket and clears the in-progress marker if
    /// it refers to that bucket.
    pub fn finish_bucket(&mut self, file_id: &str, result: BucketResult) {
        if self.in_progress.as_deref() == Some(file_id) {
            self.in_progress = None;
        }
        let list = match result {
            BucketResult::Loaded => &mut self.loaded,
            BucketResult::Skipped => &mut self.skipped,
            BucketResult::Failed => &mut self.failed,
        };
        list.push(file_id.to_string());
    }

    /// Returns the number of buckets visited so far.
    #[must_use]
    pub fn visited(&self) -> usize {
        self.loaded.len() + self.skipped.len() + self.failed.len()
    }

    /// Marks the run as completed.
    pub fn mark_completed(&mut self) {
        self.status = RunStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    /// Marks the run as failed. The in-progress marker is kept so the next
    /// run reloads that bucket.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error.into());
    }

    /// Marks the run as cancelled.
    pub fn mark_cancelled(&mut self) {
        self.status = RunStatus::Cancelled;
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_is_finished() {
        assert!(!RunStatus::Running.is_finished());
        assert!(RunStatus::Completed.is_finished());
        assert!(RunStatus::Failed.is_finished());
        assert!(RunStatus::Cancelled.is_finished());
    }

    #[test]
    fn test_bucket_lifecycle() {
        let mut run = LoadRun::new("/data", "fx_ticks", "fxcm");
        run.begin_bucket("EURUSD_2016_1");
        assert_eq!(run.in_progress.as_deref(), Some("EURUSD_2016_1"));

        run.finish_bucket("EURUSD_2016_1", BucketResult::Loaded);
        run.finish_bucket("EURUSD_2016_2", BucketResult::Skipped);
        assert!(run.in_progress.is_none());
        assert_eq!(run.loaded, vec!["EURUSD_2016_1"]);
        assert_eq!(run.visited(), 2);
    }

    #[test]
    fn test_failed_run_keeps_marker() {
        let mut run = LoadRun::new("/data", "fx_ticks", "fxcm");
        run.begin_bucket("EURUSD_2016_3");
        run.mark_failed("connection refused");

        assert!(run.is_finished());
        assert_eq!(run.in_progress.as_deref(), Some("EURUSD_2016_3"));
        assert_eq!(run.error.as_deref(), Some("connection refused"));
    }
}
