//! Error types for store access.

use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while talking to a store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// HTTP request failed or timed out.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with an error status.
    #[error("Server error {status}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Body returned by the server.
        message: String,
    },

    /// Query was rejected by the database.
    #[error("Query error: {0}")]
    Query(String),

    /// Response could not be decoded.
    #[error("Malformed response: {0}")]
    Decode(String),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Predicate with an empty `OR` filter, which cannot select any row.
    #[error("Predicate contains an empty OR filter")]
    EmptyFilter,
}
