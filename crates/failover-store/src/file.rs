//! JSON file storage implementation.
//!
//! This module provides the `JsonFileStore` implementation of the `StateStore` trait.
//! Writes go to a temporary file in the target directory which is then renamed
//! over the target, so a crash mid-write leaves the previous record intact.
//!
//! Reads and writes are blocking `std::fs` calls made while the state lock is
//! held. The record is a few hundred bytes and is written at most once per
//! cycle or mode change, so the cost is one small fsync on the runtime worker.
//! A deployment on storage slow enough for that to matter should put the
//! state file on local disk rather than a network mount.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Result, StoreError};
use crate::{StateRecord, StateStore};

/// File-backed storage for the state record.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by the file at `path`.
    ///
    /// The file does not need to exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Directory the temporary file is created in. Must be on the same
    /// filesystem as the target for the rename to be atomic.
    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl StateStore for JsonFileStore {
    fn read(&self) -> Result<Option<StateRecord>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn write(&self, record: &StateRecord) -> Result<()> {
        let dir = self.parent_dir();
        std::fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        let body = serde_json::to_vec_pretty(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(&body).map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        tracing::trace!(path = %self.path.display(), "Persisted state record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use failover_core::Mode;
    use tempfile::TempDir;

    fn create_test_store() -> (JsonFileStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        (store, dir)
    }

    #[test]
    fn missing_file_reads_as_none() {
        let (store, _dir) = create_test_store();
        assert!(store.read().unwrap().is_none());
    }

    #[test]
    fn write_then_read() {
        let (store, _dir) = create_test_store();
        let record = StateRecord {
            consecutive_failures: 0,
            outlet_asserted: true,
            recovery_since: Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()),
            mode: Mode::Auto,
        };

        store.write(&record).unwrap();
        assert_eq!(store.read().unwrap(), Some(record));
    }

    #[test]
    fn overwrite_replaces_whole_record() {
        let (store, _dir) = create_test_store();
        store
            .write(&StateRecord {
                consecutive_failures: 7,
                ..Default::default()
            })
            .unwrap();
        store
            .write(&StateRecord {
                mode: Mode::ForceOff,
                ..Default::default()
            })
            .unwrap();

        let record = store.read().unwrap().unwrap();
        assert_eq!(record.consecutive_failures, 0);
        assert_eq!(record.mode, Mode::ForceOff);
    }

    #[test]
    fn corrupt_file_is_a_serialization_error() {
        let (store, _dir) = create_test_store();
        std::fs::write(store.path(), b"{not json").unwrap();

        let err = store.read().unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn empty_file_is_corrupt() {
        let (store, _dir) = create_test_store();
        std::fs::write(store.path(), b"").unwrap();
        assert!(store.read().unwrap_err().is_corrupt());
    }

    #[test]
    fn creates_missing_parent_directory() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/deeper/state.json"));

        store.write(&StateRecord::default()).unwrap();
        assert_eq!(store.read().unwrap(), Some(StateRecord::default()));
    }

    #[test]
    fn no_temp_files_left_behind() {
        let (store, dir) = create_test_store();
        store.write(&StateRecord::default()).unwrap();
        store.write(&StateRecord::default()).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
