// ============================================================================
// src/lib.rs – password-protected private fields
// ============================================================================
//! Password vault for private field values.
//!
//! A password is turned into an AES key with PBKDF2-HMAC-SHA256. Only a
//! salted hash of that key is ever persisted, as a small verification record.
//! Field values are then encrypted with AES and PKCS#7 padding.

pub mod config;
pub mod crypto;
pub mod error;
pub mod store;
pub mod vault;

pub use error::{CipherError, CryptoError, VaultError, VaultResult};
pub use store::{FieldStore, FieldValue, FileStore, MemoryStore, RecordStore, StoreError};
pub use vault::{
    change_password, KdfParams, PasswordVault, RekeyReport, SharedVault, VaultHold,
    VerificationRecord, RECORD_NAME,
};
