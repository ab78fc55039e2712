//! Storage backends for the save blob
//!
//! A backend stores exactly one string. Writes replace it whole.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::StorageResult;

/// Durable single-blob store
pub trait StorageBackend {
    /// Read the stored blob, `Ok(None)` if nothing was saved yet
    fn read(&self) -> StorageResult<Option<String>>;
    /// Replace the stored blob
    fn write(&mut self, blob: &str) -> StorageResult<()>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    blob: Option<String>,
    writes: usize,
    fail_writes: bool,
}

/// In-process storage; clones share the same blob
///
/// Used for headless runs and as the fake in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        let storage = Self::default();
        storage.inner.borrow_mut().blob = Some(blob.into());
        storage
    }

    pub fn blob(&self) -> Option<String> {
        self.inner.borrow().blob.clone()
    }

    /// Number of successful writes
    pub fn writes(&self) -> usize {
        self.inner.borrow().writes
    }

    /// Simulate a full or unavailable store
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self) -> StorageResult<Option<String>> {
        Ok(self.inner.borrow().blob.clone())
    }

    fn write(&mut self, blob: &str) -> StorageResult<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_writes {
            return Err(crate::error::StorageError::Rejected("quota exceeded".into()));
        }
        inner.blob = Some(blob.to_string());
        inner.writes += 1;
        Ok(())
    }
}

/// JSON file on disk, written via a temp file and rename
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStorage {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl StorageBackend for FileStorage {
    fn read(&self) -> StorageResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, blob: &str) -> StorageResult<()> {
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, blob)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Browser LocalStorage under a single key
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone)]
pub struct LocalStorage {
    key: String,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    fn storage() -> StorageResult<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or_else(|| crate::error::StorageError::Unavailable("no LocalStorage".into()))
    }
}

#[cfg(target_arch = "wasm32")]
impl StorageBackend for LocalStorage {
    fn read(&self) -> StorageResult<Option<String>> {
        Self::storage()?
            .get_item(&self.key)
            .map_err(|e| crate::error::StorageError::Unavailable(format!("{:?}", e)))
    }

    fn write(&mut self, blob: &str) -> StorageResult<()> {
        Self::storage()?
            .set_item(&self.key, blob)
            .map_err(|e| crate::error::StorageError::Rejected(format!("{:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_shared() {
        let storage = MemoryStorage::new();
        let mut writer = storage.clone();
        assert!(storage.read().unwrap().is_none());
        writer.write("{}").unwrap();
        assert_eq!(storage.blob().as_deref(), Some("{}"));
        assert_eq!(storage.writes(), 1);
    }

    #[test]
    fn test_memory_storage_failure() {
        let mut storage = MemoryStorage::new();
        storage.set_fail_writes(true);
        assert!(storage.write("{}").is_err());
        assert_eq!(storage.writes(), 0);
        assert!(storage.blob().is_none());
    }

    #[test]
    fn test_file_storage_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "coin_pusher_storage_test_{}.json",
            std::process::id()
        ));
        let mut storage = FileStorage::new(&path);
        assert!(storage.read().unwrap().is_none());
        storage.write(r#"{"xp":3}"#).unwrap();
        assert_eq!(storage.read().unwrap().as_deref(), Some(r#"{"xp":3}"#));
        let _ = std::fs::remove_file(&path);
    }
}
