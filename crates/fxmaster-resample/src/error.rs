//! Error types for resampling.

use chrono::TimeDelta;
use fxmaster_store::StoreError;
use fxmaster_types::{Frequency, WindowError};
use thiserror::Error;

/// Result type alias for resampling operations.
pub type Result<T> = std::result::Result<T, ResampleError>;

/// Errors that can occur while resampling.
#[derive(Error, Debug)]
pub enum ResampleError {
    /// Store unavailable or query rejected.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Requested window is empty or inverted.
    #[error(transparent)]
    Window(#[from] WindowError),

    /// Chunk size is not a whole number of bars.
    #[error("Chunk size {chunk} is not a multiple of {frequency}")]
    ChunkSize {
        /// The configured chunk size.
        chunk: TimeDelta,
        /// The bar frequency.
        frequency: Frequency,
    },
}
