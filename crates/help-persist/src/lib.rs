//! JSON file-backed persistence for the help button server.
//!
//! [`JsonStore`] keeps one JSON document per named store inside a state
//! directory. Documents are loaded wholesale and saved as a full snapshot;
//! a save writes a sibling temp file and renames it into place so a
//! crash mid-write never leaves a truncated document behind.

#![forbid(unsafe_code)]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while reading or writing a store.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Filesystem access failed.
    #[error("io error on {path}: {source}")]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The document could not be encoded or decoded.
    #[error("invalid json in {path}: {source}")]
    Json {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying error.
        source: serde_json::Error,
    },
}

/// Result type for persistence operations.
pub type Result<T> = std::result::Result<T, PersistError>;

/// A single JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    /// Create a store for `<state_dir>/<name>.json`.
    ///
    /// Nothing is touched on disk until the first [`save`](Self::save).
    pub fn new(state_dir: &Path, name: &str) -> Self {
        Self {
            path: state_dir.join(format!("{name}.json")),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, falling back to `T::default()`.
    ///
    /// A missing file is normal on first start. A corrupt or unreadable file
    /// is logged and also degrades to the default.
    pub fn load<T>(&self) -> T
    where
        T: DeserializeOwned + Default,
    {
        match self.try_load() {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(path = %self.path.display(), "no existing state, starting empty");
                T::default()
            }
            Err(e) => {
                warn!(error = %e, "failed to load state, starting empty");
                T::default()
            }
        }
    }

    /// Load the document, reporting a missing file as `None`.
    pub fn try_load<T>(&self) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| PersistError::Json {
                path: self.path.clone(),
                source,
            })
    }

    /// Replace the document on disk with `value`.
    pub fn save<T>(&self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| PersistError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_vec_pretty(value).map_err(|source| PersistError::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| PersistError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| PersistError::Io {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), "saved state snapshot");
        Ok(())
    }
}
