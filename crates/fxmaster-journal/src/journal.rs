//! Persistent storage of load runs.

use crate::{LoadRun, RunId};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur while reading or writing the journal.
#[derive(Error, Debug)]
pub enum JournalError {
    /// Failed to create a directory.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        /// The path that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to read a file.
    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to delete a file.
    #[error("Failed to delete file '{path}': {source}")]
    DeleteFile {
        /// The path that could not be deleted.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to read a directory.
    #[error("Failed to read directory '{path}': {source}")]
    ReadDir {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse a run file.
    #[error("Failed to parse run file '{path}': {source}")]
    ParseJson {
        /// The path that could not be parsed.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Failed to serialize a run.
    #[error("Failed to serialize run: {0}")]
    SerializeJson(#[from] serde_json::Error),

    /// Run not found.
    #[error("Run not found: {0}")]
    RunNotFound(RunId),
}

/// Result type for journal operations.
pub type Result<T> = std::result::Result<T, JournalError>;

/// Stores one JSON document per load run under `<base>/runs/`.
#[derive(Debug, Clone)]
pub struct JournalStore {
    base_path: PathBuf,
    runs_path: PathBuf,
}

impl JournalStore {
    /// Opens a journal rooted at `base_path`, creating directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn new(base_path: PathBuf) -> Result<Self> {
        let runs_path = base_path.join("runs");
        fs::create_dir_all(&runs_path).map_err(|e| JournalError::CreateDir {
            path: runs_path.clone(),
            source: e,
        })?;

        Ok(Self {
            base_path,
            runs_path,
        })
    }

    /// Returns the default journal location.
    ///
    /// - Linux: `~/.local/share/fxmaster/`
    /// - macOS: `~/Library/Application Support/fxmaster/`
    /// - Windows: `C:\Users\<User>\AppData\Roaming\fxmaster\`
    ///
    /// Falls back to `~/.fxmaster/`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "fxmaster").map_or_else(dirs_fallback, |proj_dirs| {
            proj_dirs.data_dir().to_path_buf()
        })
    }

    /// Opens the journal at the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn with_default_path() -> Result<Self> {
        Self::new(Self::default_path())
    }

    /// Returns the journal root.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Returns the path of a run's file.
    #[must_use]
    pub fn run_path(&self, id: RunId) -> PathBuf {
        self.runs_path.join(format!("{id}.json"))
    }

    /// Saves a run, replacing any previous version.
    ///
    /// The document is written to a temporary file and renamed into place,
    /// so a crash never leaves a truncated run file behind.
    ///
    /// # Errors
    ///
    /// Returns an error if the run cannot be serialized or written.
    pub fn save(&self, run: &LoadRun) -> Result<()> {
        let path = self.run_path(run.id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(run)?;

        fs::write(&tmp, json).map_err(|e| JournalError::WriteFile {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &path).map_err(|e| JournalError::WriteFile { path, source: e })
    }

    /// Loads a run.
    ///
    /// # Errors
    ///
    /// Returns an error if the run does not exist or cannot be parsed.
    pub fn load(&self, id: RunId) -> Result<LoadRun> {
        let path = self.run_path(id);
        if !path.exists() {
            return Err(JournalError::RunNotFound(id));
        }

        let content = fs::read_to_string(&path).map_err(|e| JournalError::ReadFile {
            path: path.clone(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| JournalError::ParseJson { path, source: e })
    }

    /// Lists every run, newest first. Corrupt files are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the runs directory cannot be read.
    pub fn list(&self) -> Result<Vec<LoadRun>> {
        let entries = fs::read_dir(&self.runs_path).map_err(|e| JournalError::ReadDir {
            path: self.runs_path.clone(),
            source: e,
        })?;

        let mut runs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| JournalError::ReadDir {
                path: self.runs_path.clone(),
                source: e,
            })?;

            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let content = fs::read_to_string(&path).map_err(|e| JournalError::ReadFile {
                    path: path.clone(),
                    source: e,
                })?;

                match serde_json::from_str::<LoadRun>(&content) {
                    Ok(run) => runs.push(run),
                    Err(e) => warn!(path = %path.display(), error = %e, "skipping corrupt run file"),
                }
            }
        }

        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(runs)
    }

    /// Deletes a run.
    ///
    /// # Errors
    ///
    /// Returns an error if the run does not exist or cannot be deleted.
    pub fn delete(&self, id: RunId) -> Result<()> {
        let path = self.run_path(id);
        if !path.exists() {
            return Err(JournalError::RunNotFound(id));
        }
        fs::remove_file(&path).map_err(|e| JournalError::DeleteFile { path, source: e })
    }

    /// Returns the newest run that loaded into `table` for `provider`.
    ///
    /// # Errors
    ///
    /// Returns an error if runs cannot be listed.
    pub fn latest_for(&self, table: &str, provider: &str) -> Result<Option<LoadRun>> {
        Ok(self
            .list()?
            .into_iter()
            .find(|run| run.targets(table, provider)))
    }

    /// Returns the bucket left in progress by the newest run into `table`
    /// for `provider`, if that run stopped while modifying it.
    ///
    /// # Errors
    ///
    /// Returns an error if runs cannot be listed.
    pub fn interrupted_bucket(&self, table: &str, provider: &str) -> Result<Option<String>> {
        Ok(self
            .latest_for(table, provider)?
            .and_then(|run| run.in_progress))
    }
}

/// Fallback for determining home directory.
fn dirs_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".fxmaster")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BucketResult;
    use chrono::TimeDelta;
    use tempfile::TempDir;

    #[test]
    fn test_journal_creation() {
        let temp_dir = TempDir::new().unwrap();
        let journal = JournalStore::new(temp_dir.path().to_path_buf()).unwrap();

        assert!(journal.base_path().exists());
        assert!(temp_dir.path().join("runs").exists());
    }

    #[test]
    fn test_save_and_load_run() {
        let temp_dir = TempDir::new().unwrap();
        let journal = JournalStore::new(temp_dir.path().to_path_buf()).unwrap();

        let mut run = LoadRun::new("/data", "fx_ticks", "fxcm");
        run.finish_bucket("EURUSD_2016_1", BucketResult::Loaded);
        journal.save(&run).unwrap();

        let loaded = journal.load(run.id).unwrap();
        assert_eq!(loaded.id, run.id);
        assert_eq!(loaded.loaded, vec!["EURUSD_2016_1"]);
        assert!(!journal.run_path(run.id).with_extension("json.tmp").exists());
    }

    #[test]
    fn test_list_newest_first_and_skip_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let journal = JournalStore::new(temp_dir.path().to_path_buf()).unwrap();

        let mut older = LoadRun::new("/data", "fx_ticks", "fxcm");
        older.created_at -= TimeDelta::hours(1);
        let newer = LoadRun::new("/data", "fx_ticks", "fxcm");
        journal.save(&older).unwrap();
        journal.save(&newer).unwrap();
        fs::write(temp_dir.path().join("runs").join("garbage.json"), "{not json").unwrap();

        let runs = journal.list().unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, newer.id);
    }

    #[test]
    fn test_delete_run() {
        let temp_dir = TempDir::new().unwrap();
        let journal = JournalStore::new(temp_dir.path().to_path_buf()).unwrap();

        let run = LoadRun::new("/data", "fx_ticks", "fxcm");
        journal.save(&run).unwrap();
        journal.delete(run.id).unwrap();

        assert!(matches!(
            journal.load(run.id),
            Err(JournalError::RunNotFound(_))
        ));
    }

    #[test]
    fn test_interrupted_bucket_is_scoped_to_table_and_provider() {
        let temp_dir = TempDir::new().unwrap();
        let journal = JournalStore::new(temp_dir.path().to_path_buf()).unwrap();

        let mut crashed = LoadRun::new("/data", "fx_ticks", "fxcm");
        crashed.created_at -= TimeDelta::minutes(5);
        crashed.begin_bucket("EURUSD_2016_7");
        journal.save(&crashed).unwrap();

        let mut other = LoadRun::new("/data", "fx_ticks", "oanda");
        other.begin_bucket("EURUSD_2016_9");
        journal.save(&other).unwrap();

        assert_eq!(
            journal.interrupted_bucket("fx_ticks", "fxcm").unwrap().as_deref(),
            Some("EURUSD_2016_7")
        );
        assert!(journal.interrupted_bucket("fx_bars", "fxcm").unwrap().is_none());

        let clean = LoadRun::new("/data", "fx_ticks", "fxcm");
        journal.save(&clean).unwrap();
        assert!(journal.interrupted_bucket("fx_ticks", "fxcm").unwrap().is_none());
    }
}
