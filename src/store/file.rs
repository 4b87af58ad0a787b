// ============================================================================
// src/store/file.rs – JSON document store, flushed atomically on each change
// ============================================================================

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::store::atomic::atomic_write_bytes;
use crate::store::{FieldStore, FieldValue, MemoryStore, RecordStore, StoreError};

const STORE_MODE: u32 = 0o600;

/// File-backed store. The whole document is held in memory and rewritten
/// after every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    doc: MemoryStore,
}

impl FileStore {
    /// Open `path`, starting empty if it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let doc = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => MemoryStore::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => MemoryStore::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), "opened field store");
        Ok(Self { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `doc` to disk and adopt it only once the write succeeded.
    fn commit(&mut self, doc: MemoryStore) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&doc)?;
        atomic_write_bytes(&self.path, &bytes, STORE_MODE)?;
        self.doc = doc;
        Ok(())
    }
}

impl RecordStore for FileStore {
    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.doc.get(name)
    }

    fn put(&mut self, name: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut doc = self.doc.clone();
        doc.put(name, value)?;
        self.commit(doc)
    }

    fn delete(&mut self, name: &str) -> Result<bool, StoreError> {
        let mut doc = self.doc.clone();
        let removed = doc.delete(name)?;
        if removed {
            self.commit(doc)?;
        }
        Ok(removed)
    }

    fn encrypted_payload_count(&self) -> Result<usize, StoreError> {
        self.doc.encrypted_payload_count()
    }
}

impl FieldStore for FileStore {
    fn field(&self, name: &str) -> Result<Option<FieldValue>, StoreError> {
        self.doc.field(name)
    }

    fn fields(&self) -> Result<Vec<(String, FieldValue)>, StoreError> {
        self.doc.fields()
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), StoreError> {
        let mut doc = self.doc.clone();
        doc.set_field(name, value)?;
        self.commit(doc)
    }

    fn remove_field(&mut self, name: &str) -> Result<bool, StoreError> {
        let mut doc = self.doc.clone();
        let removed = doc.remove_field(name)?;
        if removed {
            self.commit(doc)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("absent.json")).unwrap();
        assert_eq!(store.get("x").unwrap(), None);
        assert!(store.fields().unwrap().is_empty());
    }

    #[test]
    fn mutations_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");

        let mut store = FileStore::open(&path).unwrap();
        store.put("record", &[2, 30, 0, 30]).unwrap();
        store
            .set_field("pin", FieldValue::Encrypted(vec![9; 16]))
            .unwrap();
        store
            .set_field("memo", FieldValue::Plain("call mom".into()))
            .unwrap();
        drop(store);

        let mut store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("record").unwrap(), Some(vec![2, 30, 0, 30]));
        assert_eq!(store.encrypted_payload_count().unwrap(), 1);
        assert_eq!(
            store.field("memo").unwrap(),
            Some(FieldValue::Plain("call mom".into()))
        );

        assert!(store.delete("record").unwrap());
        drop(store);
        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("record").unwrap(), None);
    }

    #[test]
    fn failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        let mut store = FileStore::open(&path).unwrap();
        store
            .set_field("memo", FieldValue::Plain("kept".into()))
            .unwrap();

        // Writes to a symlink target are refused.
        fs::remove_file(&path).unwrap();
        std::os::unix::fs::symlink(dir.path().join("elsewhere.json"), &path).unwrap();

        assert!(matches!(store.put("record", &[1, 2]), Err(StoreError::Io(_))));
        assert_eq!(store.get("record").unwrap(), None);

        let err = store.set_field("memo", FieldValue::Plain("lost".into()));
        assert!(matches!(err, Err(StoreError::Io(_))));
        assert!(store.remove_field("memo").is_err());
        assert_eq!(
            store.field("memo").unwrap(),
            Some(FieldValue::Plain("kept".into()))
        );
    }

    #[test]
    fn garbage_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        fs::write(&path, b"{not json").unwrap();
        assert!(matches!(FileStore::open(&path), Err(StoreError::Json(_))));
    }
}
