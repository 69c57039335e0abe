//! Checkpointing of a run in progress.

use crate::{BucketResult, JournalStore, LoadRun, Result};
use tracing::debug;

/// Tracks one load run and saves it to the journal on every transition.
///
/// The loader is sequential, so every bucket transition is written
/// immediately: the in-progress marker must be on disk before the store is
/// modified.
#[derive(Debug)]
pub struct RunTracker {
    journal: JournalStore,
    run: LoadRun,
}

impl RunTracker {
    /// Starts tracking `run` and saves it.
    ///
    /// # Errors
    ///
    /// Returns an error if the run cannot be saved.
    pub fn start(journal: JournalStore, run: LoadRun) -> Result<Self> {
        journal.save(&run)?;
        debug!(run_id = %run.id, table = %run.table, provider = %run.provider, "run started");
        Ok(Self { journal, run })
    }

    /// Returns the tracked run.
    #[must_use]
    pub const fn run(&self) -> &LoadRun {
        &self.run
    }

    /// Marks `file_id` as in progress.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint cannot be saved.
    pub fn begin_bucket(&mut self, file_id: &str) -> Result<()> {
        self.run.begin_bucket(file_id);
        self.checkpoint()
    }

    /// Clears the in-progress marker without recording a result.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint cannot be saved.
    pub fn release_bucket(&mut self) -> Result<()> {
        self.run.in_progress = None;
        self.checkpoint()
    }

    /// Records the result of `file_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint cannot be saved.
    pub fn finish_bucket(&mut self, file_id: &str, result: BucketResult) -> Result<()> {
        self.run.finish_bucket(file_id, result);
        self.checkpoint()
    }

    /// Marks the run as completed and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint cannot be saved.
    pub fn complete(mut self) -> Result<LoadRun> {
        self.run.mark_completed();
        self.checkpoint()?;
        Ok(self.run)
    }

    /// Marks the run as cancelled and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint cannot be saved.
    pub fn cancel(mut self) -> Result<LoadRun> {
        self.run.mark_cancelled();
        self.checkpoint()?;
        Ok(self.run)
    }

    /// Marks the run as failed and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint cannot be saved.
    pub fn fail(mut self, error: impl Into<String>) -> Result<LoadRun> {
        self.run.mark_failed(error);
        self.checkpoint()?;
        Ok(self.run)
    }

    fn checkpoint(&self) -> Result<()> {
        self.journal.save(&self.run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RunStatus;
    use tempfile::TempDir;

    #[test]
    fn test_marker_is_on_disk_before_work() {
        let temp_dir = TempDir::new().unwrap();
        let journal = JournalStore::new(temp_dir.path().to_path_buf()).unwrap();
        let mut tracker =
            RunTracker::start(journal.clone(), LoadRun::new("/data", "fx_ticks", "fxcm")).unwrap();
        let id = tracker.run().id;

        tracker.begin_bucket("AUDCAD_2015_1").unwrap();
        assert_eq!(
            journal.load(id).unwrap().in_progress.as_deref(),
            Some("AUDCAD_2015_1")
        );

        tracker
            .finish_bucket("AUDCAD_2015_1", BucketResult::Loaded)
            .unwrap();
        let saved = journal.load(id).unwrap();
        assert!(saved.in_progress.is_none());
        assert_eq!(saved.loaded, vec!["AUDCAD_2015_1"]);
    }

    #[test]
    fn test_terminal_states_are_saved() {
        let temp_dir = TempDir::new().unwrap();
        let journal = JournalStore::new(temp_dir.path().to_path_buf()).unwrap();

        let tracker =
            RunTracker::start(journal.clone(), LoadRun::new("/data", "fx_ticks", "fxcm")).unwrap();
        let run = tracker.complete().unwrap();
        assert_eq!(journal.load(run.id).unwrap().status, RunStatus::Completed);

        let mut tracker =
            RunTracker::start(journal.clone(), LoadRun::new("/data", "fx_ticks", "fxcm")).unwrap();
        tracker.begin_bucket("AUDCAD_2015_2").unwrap();
        let run = tracker.fail("store unavailable").unwrap();
        let saved = journal.load(run.id).unwrap();
        assert_eq!(saved.status, RunStatus::Failed);
        assert_eq!(saved.in_progress.as_deref(), Some("AUDCAD_2015_2"));
    }
}
