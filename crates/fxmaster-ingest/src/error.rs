//! Error types for ingestion.

use fxmaster_journal::JournalError;
use fxmaster_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors that end a load or validation run.
///
/// Malformed source files are not run-level errors: they surface as
/// [`DecodeError`] for the affected bucket only.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Store unavailable or query rejected.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Load journal could not be read or written.
    #[error(transparent)]
    Journal(#[from] JournalError),

    /// Source directory could not be walked.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Source file could not be decoded.
    #[error("Failed to decode {file_id}: {source}")]
    Decode {
        /// File id of the bucket.
        file_id: String,
        /// The underlying decode error.
        source: DecodeError,
    },

    /// Blocking task panicked or was cancelled.
    #[error("Blocking task failed: {0}")]
    Task(String),
}

/// Error walking the source directory tree.
#[derive(Error, Debug)]
#[error("Failed to read directory '{path}': {source}")]
pub struct CatalogError {
    /// The directory that could not be read.
    pub path: PathBuf,
    /// The underlying I/O error.
    pub source: std::io::Error,
}

/// Error decoding one source file. Fatal for the bucket only.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// File could not be opened or decompressed.
    #[error("Failed to read '{path}': {source}")]
    Read {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error (corrupt gzip streams surface here).
        source: std::io::Error,
    },

    /// A data row could not be parsed.
    #[error("Line {line}: {source}")]
    Row {
        /// One-based line number in the decompressed file.
        line: usize,
        /// The underlying parse error.
        source: ParseError,
    },

    /// Parsed rows do not match the counted data rows.
    #[error("Parsed {parsed} rows but counted {counted}")]
    RowCountMismatch {
        /// Data rows counted in the file.
        counted: u64,
        /// Rows successfully parsed.
        parsed: u64,
    },
}

/// Error parsing one `timestamp,bid,ask` row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Row does not have exactly three fields.
    #[error("Expected 3 fields, found {0}")]
    FieldCount(usize),

    /// Timestamp is not `MM/DD/YYYY HH:MM:SS.mmm`.
    #[error("Invalid timestamp '{0}'")]
    Timestamp(String),

    /// Price is not a finite positive number.
    #[error("Invalid price '{0}'")]
    Price(String),
}
