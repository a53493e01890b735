//! Artifact storage for cached symbol master snapshots
//!
//! An artifact is an opaque byte payload stored under a key together with
//! the calendar date it was last modified. Payloads are framed with a magic
//! header and a CRC32 checksum so a truncated or corrupted cache file is
//! reported instead of being handed back as valid data.

pub mod blob;
pub mod frame;

pub use blob::FileBlobStore;

use chrono::NaiveDate;
use thiserror::Error;

/// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    /// No artifact stored under the key
    #[error("artifact not found: {0}")]
    NotFound(String),

    /// Key contains characters that cannot be mapped to a file name
    #[error("invalid artifact key: {0:?}")]
    InvalidKey(String),

    /// Artifact exists but its frame is damaged
    #[error("corrupt artifact {key}: {reason}")]
    Corrupt {
        /// Artifact key
        key: String,
        /// What failed to verify
        reason: String,
    },

    /// Underlying filesystem failure
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A stored payload and its last-modified date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobArtifact {
    /// Raw payload bytes
    pub bytes: Vec<u8>,
    /// Calendar date the artifact was written for
    pub last_modified: NaiveDate,
}

/// Keyed persistence for date-stamped artifacts
pub trait BlobStore: Send + Sync {
    /// Load the artifact stored under `key`
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when nothing is stored under the
    /// key, [`StorageError::Corrupt`] when the stored frame fails
    /// verification, and [`StorageError::Io`] on filesystem failures.
    fn load(&self, key: &str) -> Result<BlobArtifact, StorageError>;

    /// Store `bytes` under `key`, replacing any previous artifact
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the artifact cannot be written.
    fn save(&self, key: &str, bytes: &[u8], last_modified: NaiveDate) -> Result<(), StorageError>;
}
