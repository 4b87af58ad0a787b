// ============================================================================
// src/store/mod.rs – persistence seams: named record blobs + private fields
// ============================================================================

pub mod atomic;
pub mod file;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use file::FileStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store document invalid: {0}")]
    Json(#[from] serde_json::Error),
}

/// Value of a private field: readable text, or ciphertext under the vault
/// password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Plain(String),
    Encrypted(#[serde(with = "hex")] Vec<u8>),
}

impl FieldValue {
    pub fn is_encrypted(&self) -> bool {
        matches!(self, FieldValue::Encrypted(_))
    }
}

/// Key-value store holding the verification record (get/put/delete by name).
pub trait RecordStore {
    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn put(&mut self, name: &str, value: &[u8]) -> Result<(), StoreError>;
    /// Returns whether something was deleted.
    fn delete(&mut self, name: &str) -> Result<bool, StoreError>;
    /// Number of payloads currently encrypted under the stored password.
    fn encrypted_payload_count(&self) -> Result<usize, StoreError>;
}

/// Named private text fields.
pub trait FieldStore {
    fn field(&self, name: &str) -> Result<Option<FieldValue>, StoreError>;
    fn fields(&self) -> Result<Vec<(String, FieldValue)>, StoreError>;
    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), StoreError>;
    fn remove_field(&mut self, name: &str) -> Result<bool, StoreError>;
}

/// In-memory store, also the document layout of [`FileStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default, with = "hex_map")]
    records: BTreeMap<String, Vec<u8>>,
    #[serde(default)]
    fields: BTreeMap<String, FieldValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.records.get(name).cloned())
    }

    fn put(&mut self, name: &str, value: &[u8]) -> Result<(), StoreError> {
        self.records.insert(name.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<bool, StoreError> {
        Ok(self.records.remove(name).is_some())
    }

    fn encrypted_payload_count(&self) -> Result<usize, StoreError> {
        Ok(self.fields.values().filter(|v| v.is_encrypted()).count())
    }
}

impl FieldStore for MemoryStore {
    fn field(&self, name: &str) -> Result<Option<FieldValue>, StoreError> {
        Ok(self.fields.get(name).cloned())
    }

    fn fields(&self) -> Result<Vec<(String, FieldValue)>, StoreError> {
        Ok(self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), StoreError> {
        self.fields.insert(name.to_string(), value);
        Ok(())
    }

    fn remove_field(&mut self, name: &str) -> Result<bool, StoreError> {
        Ok(self.fields.remove(name).is_some())
    }
}

/// Hex-encoded blob values for the record map.
mod hex_map {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<String, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let encoded: BTreeMap<&String, String> =
            map.iter().map(|(k, v)| (k, hex::encode(v))).collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Vec<u8>>, D::Error> {
        let encoded = BTreeMap::<String, String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(k, v)| {
                hex::decode(&v)
                    .map(|bytes| (k, bytes))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_only_encrypted_fields() {
        let mut store = MemoryStore::new();
        store
            .set_field("a", FieldValue::Plain("hello".into()))
            .unwrap();
        store
            .set_field("b", FieldValue::Encrypted(vec![1, 2, 3]))
            .unwrap();
        assert_eq!(store.encrypted_payload_count().unwrap(), 1);
        assert!(store.remove_field("b").unwrap());
        assert!(!store.remove_field("b").unwrap());
        assert_eq!(store.encrypted_payload_count().unwrap(), 0);
    }

    #[test]
    fn put_replaces_record() {
        let mut store = MemoryStore::new();
        store.put("r", &[1]).unwrap();
        store.put("r", &[2, 3]).unwrap();
        assert_eq!(store.get("r").unwrap(), Some(vec![2, 3]));
        assert!(store.delete("r").unwrap());
        assert_eq!(store.get("r").unwrap(), None);
    }

    #[test]
    fn document_encodes_blobs_as_hex() {
        let mut store = MemoryStore::new();
        store.put("rec", &[0xde, 0xad]).unwrap();
        store
            .set_field("note", FieldValue::Encrypted(vec![0xbe, 0xef]))
            .unwrap();
        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(json["records"]["rec"], "dead");
        assert_eq!(json["fields"]["note"]["kind"], "encrypted");
        assert_eq!(json["fields"]["note"]["value"], "beef");

        let back: MemoryStore = serde_json::from_value(json).unwrap();
        assert_eq!(back, store);
    }
}
