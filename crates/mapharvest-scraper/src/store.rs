//! Durable mirroring of the accumulated record sequence.
//!
//! The engine mirrors the full sequence on every acceptance, keyed under the
//! single well-known collection name. Each mirror is a full overwrite, never
//! an incremental append, so a reader always sees one consistent sequence
//! and a crashed session leaves behind its latest complete state.

use std::path::{Path, PathBuf};

use mapharvest_core::BusinessRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Collection name records are stored under.
pub const COLLECTION_KEY: &str = "businesses";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access record store {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("record store serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Destination for record-sequence mirrors.
///
/// Implementations receive the full accumulated sequence each time and
/// replace whatever they previously held.
pub trait RecordStore {
    /// Overwrites the stored collection with `records`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the mirror cannot be written. The engine
    /// treats this as a soft failure: it logs and keeps traversing.
    fn save_all(&mut self, records: &[BusinessRecord]) -> Result<(), StoreError>;
}

/// Discards every mirror. For embedders that only read the final sequence
/// from the session.
pub struct NullStore;

impl RecordStore for NullStore {
    fn save_all(&mut self, _records: &[BusinessRecord]) -> Result<(), StoreError> {
        Ok(())
    }
}

/// On-disk JSON document shape: `{"businesses": [...]}`.
#[derive(Serialize, Deserialize)]
struct StoreDocument {
    businesses: Vec<BusinessRecord>,
}

/// JSON-file store.
///
/// Writes go through a sibling temp file and an atomic rename so a reader
/// never observes a torn document.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored collection back.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the file cannot be read and
    /// [`StoreError::Serde`] when it does not parse as a store document.
    pub fn load(&self) -> Result<Vec<BusinessRecord>, StoreError> {
        let json = std::fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        let doc: StoreDocument = serde_json::from_str(&json)?;
        Ok(doc.businesses)
    }
}

impl RecordStore for JsonFileStore {
    fn save_all(&mut self, records: &[BusinessRecord]) -> Result<(), StoreError> {
        let doc = StoreDocument {
            businesses: records.to_vec(),
        };
        let json = serde_json::to_string_pretty(&doc)?;

        let tmp = self.path.with_extension("json.tmp");
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        };
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}
