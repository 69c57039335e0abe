//! Source file discovery.

use fxmaster_store::TickStore;
use fxmaster_types::{Predicate, SourceFile, Tag};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::vec;

use crate::{CatalogError, Result};

/// A directory tree of weekly source files.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
}

impl Catalog {
    /// Creates a catalog rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walks the tree depth-first, visiting entries in lexicographic order,
    /// and yields every file whose name follows the naming convention.
    ///
    /// The walk is lazy and can be restarted by calling `enumerate` again.
    /// An I/O error is yielded once and ends the walk.
    #[must_use]
    pub fn enumerate(&self) -> CatalogWalk {
        CatalogWalk {
            pending: Some(self.root.clone()),
            stack: Vec::new(),
            done: false,
        }
    }

    /// Collects the whole catalog.
    ///
    /// # Errors
    ///
    /// Returns the first directory walk error.
    pub fn files(&self) -> std::result::Result<Vec<SourceFile>, CatalogError> {
        self.enumerate().collect()
    }
}

/// Lazy depth-first walk returned by [`Catalog::enumerate`].
#[derive(Debug)]
pub struct CatalogWalk {
    pending: Option<PathBuf>,
    stack: Vec<vec::IntoIter<PathBuf>>,
    done: bool,
}

impl CatalogWalk {
    fn push_dir(&mut self, dir: &Path) -> std::result::Result<(), CatalogError> {
        let error = |source| CatalogError {
            path: dir.to_path_buf(),
            source,
        };
        let mut entries = fs::read_dir(dir)
            .map_err(error)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(error)?;
        entries.sort();
        self.stack.push(entries.into_iter());
        Ok(())
    }
}

impl Iterator for CatalogWalk {
    type Item = std::result::Result<SourceFile, CatalogError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(root) = self.pending.take()
            && let Err(e) = self.push_dir(&root)
        {
            self.done = true;
            return Some(Err(e));
        }

        while let Some(entries) = self.stack.last_mut() {
            let Some(path) = entries.next() else {
                self.stack.pop();
                continue;
            };

            if path.is_dir() {
                if let Err(e) = self.push_dir(&path) {
                    self.done = true;
                    return Some(Err(e));
                }
            } else if let Some(file) = SourceFile::from_path(&path) {
                return Some(Ok(file));
            }
        }

        self.done = true;
        None
    }
}

/// Removes files whose bucket is already loaded.
#[must_use]
pub fn diff(files: Vec<SourceFile>, loaded_ids: &HashSet<String>) -> Vec<SourceFile> {
    files
        .into_iter()
        .filter(|file| !loaded_ids.contains(&file.file_id()))
        .collect()
}

/// Returns the file ids with at least one stored row in `table` for
/// `provider`.
///
/// # Errors
///
/// Returns an error if the store query fails.
pub async fn loaded_ids(
    store: &dyn TickStore,
    table: &str,
    provider: &str,
) -> Result<HashSet<String>> {
    let predicate = Predicate::any().and_eq(Tag::Provider, provider);
    Ok(store
        .count_by(table, &predicate, Tag::Filename)
        .await?
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(id, _)| id)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompress::fixtures::{tick_rows, write_gz};
    use fxmaster_store::MemoryStore;
    use fxmaster_types::Quote;
    use tempfile::TempDir;

    fn ids(files: &[SourceFile]) -> Vec<String> {
        files.iter().map(SourceFile::file_id).collect()
    }

    #[test]
    fn test_enumerate_filters_and_orders() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let body = tick_rows(1);
        write_gz(&root.join("EURUSD/2016"), "EURUSD_2016_5.csv.gz", &body);
        write_gz(&root.join("EURUSD/2016"), "EURUSD_2016_10.csv.gz", &body);
        write_gz(&root.join("AUDCAD/2015"), "AUDCAD_2015_1.csv.gz", &body);
        write_gz(&root.join("EURUSD/2016"), "eurusd_2016_5.csv.gz", &body);
        write_gz(&root.join("EURUSD/2016"), "EURUSD_16_5.csv.gz", &body);
        fs::write(root.join("EURUSD/2016/EURUSD_2016_5.csv"), "x").unwrap();

        let catalog = Catalog::new(root);
        let files = catalog.files().unwrap();
        assert_eq!(
            ids(&files),
            vec!["AUDCAD_2015_1", "EURUSD_2016_10", "EURUSD_2016_5"]
        );

        // Restartable.
        assert_eq!(ids(&catalog.files().unwrap()), ids(&files));
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut walk = Catalog::new(temp_dir.path().join("missing")).enumerate();
        assert!(matches!(walk.next(), Some(Err(_))));
        assert!(walk.next().is_none());
    }

    #[test]
    fn test_diff() {
        let files = vec![
            SourceFile::from_path("/d/AUDCAD_2015_1.csv.gz").unwrap(),
            SourceFile::from_path("/d/AUDCAD_2015_2.csv.gz").unwrap(),
        ];
        let loaded = HashSet::from(["AUDCAD_2015_1".to_string()]);
        assert_eq!(ids(&diff(files, &loaded)), vec!["AUDCAD_2015_2"]);
    }

    #[tokio::test]
    async fn test_loaded_ids_by_provider() {
        let store = MemoryStore::new();
        let file = SourceFile::from_path("/d/AUDCAD_2015_1.csv.gz").unwrap();
        let quote = Quote::new(chrono::Utc::now(), 0.9, 0.91);
        store
            .write_ticks("fx_ticks", &file.tags("fxcm"), &[quote])
            .await
            .unwrap();

        let ids = loaded_ids(&store, "fx_ticks", "fxcm").await.unwrap();
        assert!(ids.contains("AUDCAD_2015_1"));
        assert!(loaded_ids(&store, "fx_ticks", "oanda").await.unwrap().is_empty());
    }
}
