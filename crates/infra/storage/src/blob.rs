//! File-backed blob store: one framed file per key

use crate::frame;
use crate::{BlobArtifact, BlobStore, StorageError};
use chrono::NaiveDate;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension used for artifact files
const BLOB_EXTENSION: &str = "blob";

/// Extension used while an artifact is being written
const TMP_EXTENSION: &str = "blob.tmp";

/// Stores each artifact as `<dir>/<key>.blob`
///
/// Writes go to a temporary sibling that is synced and then renamed over the
/// target, so readers see either the old artifact or the new one.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory holding the artifacts
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact file for `key`
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] for empty keys or keys with
    /// characters outside `[A-Za-z0-9_.-]`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{BLOB_EXTENSION}")))
    }
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

impl BlobStore for FileBlobStore {
    fn load(&self, key: &str) -> Result<BlobArtifact, StorageError> {
        let path = self.path_for(key)?;
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let artifact = frame::decode(key, &data)?;
        debug!(
            "Loaded artifact {} ({} bytes, modified {})",
            path.display(),
            artifact.bytes.len(),
            artifact.last_modified
        );
        Ok(artifact)
    }

    fn save(&self, key: &str, bytes: &[u8], last_modified: NaiveDate) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp_path = self.dir.join(format!("{key}.{TMP_EXTENSION}"));
        let framed = frame::encode(bytes, last_modified)?;

        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&framed)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        debug!(
            "Saved artifact {} ({} bytes, modified {})",
            path.display(),
            bytes.len(),
            last_modified
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_validation() {
        assert!(validate_key("bfo_master").is_ok());
        assert!(validate_key("bfo-master.v1").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("a/b").is_err());
    }
}
