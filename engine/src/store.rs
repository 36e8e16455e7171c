//! Durable cross-page state: the status mailbox and the back-navigation flag.
//!
//! Two tiny pieces of state outlive a page: the last server-confirmed enabled
//! status of a form, and a marker that the user is returning from a detail
//! page. Both are single-use. Reading one deletes it, so a stale value can
//! never be applied twice.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use switchboard_types::LastKnownStatus;

const STATUS_FILE: &str = "last_status.json";
const BACK_FLAG_FILE: &str = "returning_from_detail";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read state at {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write state at {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("state at {path} is corrupt")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Storage seam for cross-page state.
///
/// `take_*` methods consume: after a successful call the stored value is
/// gone, whatever it was.
pub trait StatusStore {
    /// Record the last server-confirmed status, replacing any previous one.
    fn put_last_status(&mut self, status: LastKnownStatus) -> Result<(), StoreError>;

    /// Read and delete the recorded status, if any.
    fn take_last_status(&mut self) -> Result<Option<LastKnownStatus>, StoreError>;

    /// Mark that the user is navigating back from a form detail page.
    fn set_returning_from_detail(&mut self) -> Result<(), StoreError>;

    /// Read and clear the back-navigation marker.
    fn take_returning_from_detail(&mut self) -> Result<bool, StoreError>;
}

/// File-backed store under a state directory.
///
/// Writes go through a temp file in the same directory followed by a rename,
/// so a crash mid-write leaves either the old value or the new one, never a
/// torn file.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Write {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn status_path(&self) -> PathBuf {
        self.dir.join(STATUS_FILE)
    }

    fn flag_path(&self) -> PathBuf {
        self.dir.join(BACK_FLAG_FILE)
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        tmp.write_all(bytes).map_err(write_err)?;
        tmp.persist(path)
            .map_err(|err| write_err(err.error))
            .map(|_| ())
    }

    /// Read and delete in one step. A missing file is simply `None`.
    fn take_file(&self, path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(path) {
            Ok(bytes) => {
                fs::remove_file(path).map_err(|source| StoreError::Write {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(Some(bytes))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl StatusStore for FileStore {
    fn put_last_status(&mut self, status: LastKnownStatus) -> Result<(), StoreError> {
        let path = self.status_path();
        let bytes = serde_json::to_vec(&status).map_err(|source| StoreError::Corrupt {
            path: path.clone(),
            source,
        })?;
        debug!(form_id = %status.form_id, enabled = status.enabled, "recording last known status");
        self.write_atomic(&path, &bytes)
    }

    fn take_last_status(&mut self) -> Result<Option<LastKnownStatus>, StoreError> {
        let path = self.status_path();
        let Some(bytes) = self.take_file(&path)? else {
            return Ok(None);
        };
        let status =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt { path, source })?;
        Ok(Some(status))
    }

    fn set_returning_from_detail(&mut self) -> Result<(), StoreError> {
        self.write_atomic(&self.flag_path(), b"")
    }

    fn take_returning_from_detail(&mut self) -> Result<bool, StoreError> {
        Ok(self.take_file(&self.flag_path())?.is_some())
    }
}

/// In-memory store for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    last_status: Option<LastKnownStatus>,
    returning: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusStore for MemoryStore {
    fn put_last_status(&mut self, status: LastKnownStatus) -> Result<(), StoreError> {
        self.last_status = Some(status);
        Ok(())
    }

    fn take_last_status(&mut self) -> Result<Option<LastKnownStatus>, StoreError> {
        Ok(self.last_status.take())
    }

    fn set_returning_from_detail(&mut self) -> Result<(), StoreError> {
        self.returning = true;
        Ok(())
    }

    fn take_returning_from_detail(&mut self) -> Result<bool, StoreError> {
        Ok(std::mem::take(&mut self.returning))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_types::FormId;

    #[test]
    fn file_store_round_trips_and_consumes_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path()).unwrap();

        let status = LastKnownStatus::new(FormId::new(12), true);
        store.put_last_status(status).unwrap();

        assert_eq!(store.take_last_status().unwrap(), Some(status));
        assert_eq!(store.take_last_status().unwrap(), None);
    }

    #[test]
    fn newer_status_replaces_older() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path()).unwrap();

        store
            .put_last_status(LastKnownStatus::new(FormId::new(1), true))
            .unwrap();
        store
            .put_last_status(LastKnownStatus::new(FormId::new(2), false))
            .unwrap();

        assert_eq!(
            store.take_last_status().unwrap(),
            Some(LastKnownStatus::new(FormId::new(2), false))
        );
    }

    #[test]
    fn back_flag_is_single_use() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path()).unwrap();

        assert!(!store.take_returning_from_detail().unwrap());
        store.set_returning_from_detail().unwrap();
        assert!(store.take_returning_from_detail().unwrap());
        assert!(!store.take_returning_from_detail().unwrap());
    }

    #[test]
    fn corrupt_status_file_reports_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path()).unwrap();
        fs::write(dir.path().join(STATUS_FILE), b"not json").unwrap();

        let err = store.take_last_status().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
        // The corrupt file was consumed; the next read starts clean.
        assert_eq!(store.take_last_status().unwrap(), None);
    }

    #[test]
    fn memory_store_matches_file_semantics() {
        let mut store = MemoryStore::new();
        assert_eq!(store.take_last_status().unwrap(), None);

        store
            .put_last_status(LastKnownStatus::new(FormId::new(5), false))
            .unwrap();
        assert!(store.take_last_status().unwrap().is_some());
        assert!(store.take_last_status().unwrap().is_none());

        store.set_returning_from_detail().unwrap();
        assert!(store.take_returning_from_detail().unwrap());
        assert!(!store.take_returning_from_detail().unwrap());
    }
}
