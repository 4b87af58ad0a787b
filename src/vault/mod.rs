// ============================================================================
// src/vault/mod.rs – password/key lifecycle and private payload encryption
// ============================================================================

pub mod record;
pub mod rekey;
pub mod shared;

use std::fmt;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto::{password_bytes, pkcs7_decrypt, pkcs7_encrypt, AesTransform, Pbkdf2};
use crate::error::{VaultError, VaultResult};
use crate::store::RecordStore;

pub use record::{KdfParams, VerificationRecord, RECORD_NAME};
pub use rekey::{change_password, RekeyReport};
pub use shared::{SharedVault, VaultHold};

/// Holds the user's password and the key derived from it.
///
/// Nothing here is ever persisted except through [`store_password`], which
/// writes only the salted verification hash. Password, salt and key are
/// wiped whenever they are replaced or forgotten.
///
/// [`store_password`]: PasswordVault::store_password
pub struct PasswordVault {
    params: KdfParams,
    password: Option<Zeroizing<String>>,
    salt: Option<Zeroizing<Vec<u8>>>,
    key: Option<Zeroizing<Vec<u8>>>,
}

impl Default for PasswordVault {
    fn default() -> Self {
        Self::with_params(KdfParams::default())
    }
}

impl fmt::Debug for PasswordVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordVault")
            .field("params", &self.params)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("salt_len", &self.salt.as_ref().map(|s| s.len()))
            .field("has_key", &self.key.is_some())
            .finish()
    }
}

impl PasswordVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vault whose new salts and keys use `params`. Records read by
    /// [`check_password`](Self::check_password) override them.
    pub fn with_params(params: KdfParams) -> Self {
        Self {
            params,
            password: None,
            salt: None,
            key: None,
        }
    }

    pub fn params(&self) -> KdfParams {
        self.params
    }

    /// Copy the password into the vault. Does not check it against any
    /// stored record, so two vaults can hold old and new passwords during a
    /// password change.
    pub fn set_password(&mut self, password: &str) {
        self.password = Some(Zeroizing::new(password.to_owned()));
        self.key = None;
    }

    /// A copy of the current password.
    pub fn get_password(&self) -> Option<Zeroizing<String>> {
        self.password.clone()
    }

    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Generate fresh salt; any derived key is discarded.
    pub fn add_salt(&mut self) -> VaultResult<()> {
        self.params.validate()?;
        let mut salt = Zeroizing::new(vec![0u8; self.params.salt_len]);
        getrandom::getrandom(&mut salt).map_err(|e| VaultError::Entropy(e.to_string()))?;
        self.salt = Some(salt);
        self.key = None;
        Ok(())
    }

    /// Whether a verification record exists. No local password needed.
    pub fn has_password(&self, store: &impl RecordStore) -> VaultResult<bool> {
        Ok(store.get(RECORD_NAME)?.is_some())
    }

    /// Check the local password against the stored record.
    ///
    /// On a match the record's salt and parameters are adopted along with the
    /// derived key. On a mismatch the vault is left without key or salt.
    pub fn check_password(&mut self, store: &impl RecordStore) -> VaultResult<bool> {
        let password = self
            .password
            .as_ref()
            .ok_or(VaultError::Configuration("password is not set"))?;
        let bytes = store
            .get(RECORD_NAME)?
            .ok_or(VaultError::Configuration("no password record in store"))?;
        let record = VerificationRecord::parse(&bytes)?;

        let candidate = derive_key(password, &record.salt, record.params)?;
        if record.matches(&candidate) {
            debug!(
                iterations = record.params.iterations,
                key_bits = record.params.key_bits,
                "password matches stored record"
            );
            self.params = record.params;
            self.salt = Some(Zeroizing::new(record.salt));
            self.key = Some(candidate);
            return Ok(true);
        }

        debug!("password does not match stored record");
        self.key = None;
        self.salt = None;
        Ok(false)
    }

    /// Write the verification record for the current password, replacing
    /// any previous record.
    pub fn store_password(&mut self, store: &mut impl RecordStore) -> VaultResult<()> {
        self.params.validate()?;
        if self.key.is_none() && self.salt.is_none() {
            self.add_salt()?;
        }
        let key = self.ensure_key()?;
        let salt = self
            .salt
            .as_ref()
            .ok_or(VaultError::Configuration("no salt"))?;

        let record = VerificationRecord::seal(self.params, salt, &key);
        store.put(RECORD_NAME, &record.to_bytes())?;
        info!(
            salt_len = record.params.salt_len,
            iterations = record.params.iterations,
            "stored password verification record"
        );
        Ok(())
    }

    /// Delete the stored record. Refused while any payload is still
    /// encrypted, since that ciphertext would become unreadable.
    pub fn remove_password(&self, store: &mut impl RecordStore) -> VaultResult<()> {
        let remaining = store.encrypted_payload_count()?;
        if remaining > 0 {
            warn!(remaining, "refusing to remove password while records are encrypted");
            return Err(VaultError::PreconditionViolation { remaining });
        }
        if store.delete(RECORD_NAME)? {
            info!("removed password verification record");
        }
        Ok(())
    }

    pub fn encrypt(&mut self, text: &str) -> VaultResult<Vec<u8>> {
        self.encrypt_bytes(text.as_bytes())
    }

    pub fn encrypt_bytes(&mut self, plain: &[u8]) -> VaultResult<Vec<u8>> {
        let cipher = self.cipher()?;
        pkcs7_encrypt(cipher, plain).map_err(|e| {
            debug!(error = %e, "encryption failed");
            self.forget_password();
            VaultError::WrongPassword
        })
    }

    /// Decrypt to text. Bad padding, misaligned input and invalid UTF-8
    /// all surface as [`VaultError::WrongPassword`], after the vault has
    /// forgotten its password and key.
    pub fn decrypt(&mut self, code: &[u8]) -> VaultResult<String> {
        let plain = self.decrypt_bytes(code)?;
        match std::str::from_utf8(&plain) {
            Ok(text) => Ok(text.to_owned()),
            Err(_) => {
                debug!("decrypted payload is not UTF-8");
                self.forget_password();
                Err(VaultError::WrongPassword)
            }
        }
    }

    pub fn decrypt_bytes(&mut self, code: &[u8]) -> VaultResult<Zeroizing<Vec<u8>>> {
        let cipher = self.cipher()?;
        pkcs7_decrypt(cipher, code).map_err(|e| {
            debug!(error = %e, "decryption failed");
            self.forget_password();
            VaultError::WrongPassword
        })
    }

    /// Wipe and drop key, salt and password.
    pub fn forget_password(&mut self) {
        if self.key.is_some() || self.password.is_some() {
            debug!("forgetting password and key");
        }
        self.key = None;
        self.salt = None;
        self.password = None;
    }

    fn cipher(&mut self) -> VaultResult<AesTransform> {
        let key = self.ensure_key()?;
        Ok(AesTransform::new(&key)?)
    }

    /// The derived key, deriving it first if needed.
    fn ensure_key(&mut self) -> VaultResult<Zeroizing<Vec<u8>>> {
        if let Some(key) = &self.key {
            return Ok(key.clone());
        }
        let password = self
            .password
            .as_ref()
            .ok_or(VaultError::Configuration("password is not set"))?;
        let salt = self
            .salt
            .as_ref()
            .ok_or(VaultError::Configuration("no salt"))?;
        let key = derive_key(password, salt, self.params)?;
        self.key = Some(key.clone());
        Ok(key)
    }
}

fn derive_key(password: &str, salt: &[u8], params: KdfParams) -> VaultResult<Zeroizing<Vec<u8>>> {
    let password = password_bytes(password);
    let mut kdf = Pbkdf2::new(&password, salt, params.iterations)?;
    Ok(kdf.generate(params.key_bits))
}
