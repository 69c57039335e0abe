//! Row-count reconciliation between source files and the store.

use fxmaster_store::TickStore;
use fxmaster_types::{Predicate, SourceFile, TagSet, ValidationOutcome};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::decompress::count_rows;
use crate::{DecodeError, Result};

/// Default tolerance, in rows, for an acceptable bucket.
pub const DEFAULT_TOLERANCE: u64 = 10;

/// Decides whether buckets are already represented in the store.
#[derive(Clone)]
pub struct Validator {
    store: Arc<dyn TickStore>,
    table: String,
    validation_table: Option<String>,
    tolerance: u64,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("table", &self.table)
            .field("validation_table", &self.validation_table)
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}

impl Validator {
    /// Creates a validator for ticks in `table`.
    pub fn new(store: Arc<dyn TickStore>, table: impl Into<String>, tolerance: u64) -> Self {
        Self {
            store,
            table: table.into(),
            validation_table: None,
            tolerance,
        }
    }

    /// Caches every full validation in `table`, enabling
    /// [`validate_fast`](Self::validate_fast).
    #[must_use]
    pub fn with_cache(mut self, table: impl Into<String>) -> Self {
        self.validation_table = Some(table.into());
        self
    }

    /// Returns the tolerance.
    #[must_use]
    pub const fn tolerance(&self) -> u64 {
        self.tolerance
    }

    /// Fully validates `file` for `provider`.
    ///
    /// The outer error is a store failure and ends the run; the inner one
    /// means the source file itself is unreadable.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn validate(
        &self,
        file: &SourceFile,
        provider: &str,
    ) -> Result<std::result::Result<ValidationOutcome, DecodeError>> {
        let csv_row_count = match count_rows(file).await? {
            Ok(count) => count,
            Err(e) => return Ok(Err(e)),
        };
        self.validate_counted(file, provider, csv_row_count)
            .await
            .map(Ok)
    }

    /// Validates `file` against an already known source row count.
    ///
    /// The store count is always queried fresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn validate_counted(
        &self,
        file: &SourceFile,
        provider: &str,
        csv_row_count: u64,
    ) -> Result<ValidationOutcome> {
        let tags = file.tags(provider);
        let store_row_count = self
            .store
            .count(&self.table, &Predicate::exact(&tags))
            .await?;
        let outcome = ValidationOutcome::reconcile(csv_row_count, store_row_count, self.tolerance);

        self.refresh_cache(&tags, &outcome).await?;
        log_outcome(&file.file_id(), &outcome);
        Ok(outcome)
    }

    /// Validates `file` from the cached row when it is still current.
    ///
    /// A missing cache row, a failed cache read, or a cached store count
    /// that differs from the live count all fall back to
    /// [`validate`](Self::validate).
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn validate_fast(
        &self,
        file: &SourceFile,
        provider: &str,
    ) -> Result<std::result::Result<ValidationOutcome, DecodeError>> {
        if let Some(cache) = &self.validation_table {
            let tags = file.tags(provider);
            match self.cached(cache, &tags).await {
                Ok(Some(outcome)) => {
                    debug!(file_id = %file.file_id(), status = %outcome.status, "cached validation");
                    return Ok(Ok(outcome));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(file_id = %file.file_id(), error = %e, "validation cache unavailable");
                }
            }
        }
        self.validate(file, provider).await
    }

    /// Returns the cached outcome if its store count is still current.
    async fn cached(&self, cache: &str, tags: &TagSet) -> Result<Option<ValidationOutcome>> {
        let Some(outcome) = self.store.read_validation(cache, tags).await? else {
            return Ok(None);
        };
        let live = self.store.count(&self.table, &Predicate::exact(tags)).await?;
        Ok((live == outcome.store_row_count).then_some(outcome))
    }

    async fn refresh_cache(&self, tags: &TagSet, outcome: &ValidationOutcome) -> Result<()> {
        if let Some(cache) = &self.validation_table {
            self.store.write_validation(cache, tags, outcome).await?;
        }
        Ok(())
    }
}

fn log_outcome(file_id: &str, outcome: &ValidationOutcome) {
    if outcome.is_satisfactory() {
        debug!(
            file_id,
            status = %outcome.status,
            difference = outcome.difference,
            "validated"
        );
    } else {
        info!(
            file_id,
            status = %outcome.status,
            csv_rows = outcome.csv_row_count,
            store_rows = outcome.store_row_count,
            difference = outcome.difference,
            "validated"
        );
    }
}
