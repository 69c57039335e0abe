//! Row-count reconciliation between a source file and the store.

use serde::{Deserialize, Serialize};

/// How well a bucket is represented in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    /// No stored row carries the bucket's tags.
    Absent,
    /// Stored and source row counts agree.
    Exact,
    /// Counts differ by no more than the tolerance.
    Acceptable,
    /// Counts differ by more than the tolerance.
    Unacceptable,
}

impl ValidationStatus {
    /// Returns the status name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Exact => "exact",
            Self::Acceptable => "acceptable",
            Self::Unacceptable => "unacceptable",
        }
    }

    /// Returns true if the bucket needs no reload.
    #[must_use]
    pub const fn is_satisfactory(&self) -> bool {
        matches!(self, Self::Exact | Self::Acceptable)
    }
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of reconciling one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Reconciliation status.
    pub status: ValidationStatus,
    /// Data rows in the source file.
    pub csv_row_count: u64,
    /// Rows in the store matching the bucket's tags.
    pub store_row_count: u64,
    /// `csv_row_count - store_row_count`.
    pub difference: i64,
}

impl ValidationOutcome {
    /// Compares a source row count with a store row count.
    ///
    /// A store count of zero means the bucket is [`ValidationStatus::Absent`].
    ///
    /// # Example
    ///
    /// ```
    /// use fxmaster_types::{ValidationOutcome, ValidationStatus};
    ///
    /// let outcome = ValidationOutcome::reconcile(1000, 995, 10);
    /// assert_eq!(outcome.status, ValidationStatus::Acceptable);
    /// assert_eq!(outcome.difference, 5);
    /// ```
    #[must_use]
    pub fn reconcile(csv_row_count: u64, store_row_count: u64, tolerance: u64) -> Self {
        let difference = csv_row_count as i64 - store_row_count as i64;
        let status = if store_row_count == 0 {
            ValidationStatus::Absent
        } else if difference == 0 {
            ValidationStatus::Exact
        } else if difference.unsigned_abs() <= tolerance {
            ValidationStatus::Acceptable
        } else {
            ValidationStatus::Unacceptable
        };

        Self {
            status,
            csv_row_count,
            store_row_count,
            difference,
        }
    }

    /// Returns true if the bucket needs no reload.
    #[must_use]
    pub const fn is_satisfactory(&self) -> bool {
        self.status.is_satisfactory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent() {
        let outcome = ValidationOutcome::reconcile(500, 0, 10);
        assert_eq!(outcome.status, ValidationStatus::Absent);
        assert_eq!(outcome.difference, 500);
        assert!(!outcome.is_satisfactory());
    }

    #[test]
    fn test_exact() {
        let outcome = ValidationOutcome::reconcile(500, 500, 10);
        assert_eq!(outcome.status, ValidationStatus::Exact);
        assert!(outcome.is_satisfactory());
    }

    #[test]
    fn test_tolerance_is_inclusive_both_ways() {
        assert_eq!(
            ValidationOutcome::reconcile(500, 490, 10).status,
            ValidationStatus::Acceptable
        );
        assert_eq!(
            ValidationOutcome::reconcile(500, 510, 10).status,
            ValidationStatus::Acceptable
        );
        assert_eq!(
            ValidationOutcome::reconcile(500, 489, 10).status,
            ValidationStatus::Unacceptable
        );
        assert_eq!(ValidationOutcome::reconcile(500, 511, 10).difference, -11);
    }

    #[test]
    fn test_zero_tolerance() {
        assert_eq!(
            ValidationOutcome::reconcile(500, 499, 0).status,
            ValidationStatus::Unacceptable
        );
    }
}
