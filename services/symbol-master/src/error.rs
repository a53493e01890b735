//! Error types for symbol master refresh and queries

use chrono::NaiveDate;
use storage::StorageError;
use thiserror::Error;

/// Raw file download failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network unreachable, timeout, or body read failure
    #[error("request to {url} failed: {reason}")]
    Request {
        /// Requested URL
        url: String,
        /// Transport error message
        reason: String,
    },

    /// Server answered with a non-2xx status
    #[error("request to {url} returned HTTP {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },
}

/// Failures while acquiring, normalizing or persisting the master table
#[derive(Debug, Error)]
pub enum StoreError {
    /// Download failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Archive or table malformed, or expected columns missing
    #[error("parse error: {0}")]
    Parse(String),

    /// Snapshot violates a uniqueness or consistency rule
    #[error("validation error: {0}")]
    Validation(String),

    /// Persistence read/write failure
    #[error("persistence error: {0}")]
    Io(#[from] StorageError),

    /// A refresh already failed today; only a forced refresh retries
    #[error("refresh already failed on {date}: {reason}")]
    RefreshDeferred {
        /// Day of the failed attempt
        date: NaiveDate,
        /// Error of that attempt
        reason: String,
    },

    /// No snapshot has been loaded yet
    #[error("symbol master not initialized")]
    NotInitialized,
}

impl StoreError {
    /// Build a persistence error from any displayable cause
    pub(crate) fn io(reason: impl std::fmt::Display) -> Self {
        Self::Io(StorageError::Io(std::io::Error::other(reason.to_string())))
    }
}

/// Query-side failures; never retried, they indicate a caller/data mismatch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Nothing in the snapshot matches
    #[error("no match: {0}")]
    NoMatch(String),

    /// More than one row matches a query that must be unique
    #[error("ambiguous match: {count} rows for {query}")]
    AmbiguousMatch {
        /// Number of matching rows
        count: usize,
        /// Query description
        query: String,
    },

    /// Arguments do not describe a valid query
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Requested position does not exist in the expiry sequence
    #[error("index out of range: {0}")]
    IndexOutOfRange(String),
}
