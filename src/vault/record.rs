// ============================================================================
// src/vault/record.rs – persisted password verification record (scheme 2)
// ============================================================================
//
// Layout, big-endian:
//
//   scheme (1) | salt_len - 2 (1) | key_len - 2 (2) | iterations - 1 (2)
//   | salt (salt_len) | SHA-256(header | salt | key) (32)
//
// Lengths are biased so a zero byte still describes a usable value. Every
// parameter is read back from the record, never taken from current defaults.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::AesTransform;
use crate::error::{VaultError, VaultResult};

/// PBKDF2-HMAC-SHA256 key, SHA-256 verification hash, AES/ECB/PKCS#7.
pub const SCHEME_PBKDF2_AES: u8 = 2;
pub const HEADER_LEN: usize = 6;
pub const HASH_LEN: usize = 32;

/// Name of the blob in the record store.
pub const RECORD_NAME: &str = "StringEncryption.HashedPassword";

const SALT_BIAS: usize = 2;
const KEY_BIAS: usize = 2;
const ITERATION_BIAS: u32 = 1;

/// Key derivation parameters carried by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    /// Salt length in bytes.
    pub salt_len: usize,
    /// Derived key length in bits.
    pub key_bits: usize,
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            salt_len: 32,
            key_bits: 256,
            iterations: 1000,
        }
    }
}

impl KdfParams {
    pub fn key_len(&self) -> usize {
        self.key_bits.div_ceil(8)
    }

    /// Reject values the record header cannot encode or the cipher cannot use.
    pub fn validate(&self) -> VaultResult<()> {
        if !(SALT_BIAS..=u8::MAX as usize + SALT_BIAS).contains(&self.salt_len) {
            return Err(VaultError::Configuration("salt length must be 2..=257 bytes"));
        }
        if self.key_bits % 8 != 0 || !AesTransform::supports_key_len(self.key_len()) {
            return Err(VaultError::Configuration("key length must be 128, 192 or 256 bits"));
        }
        if !(1..=u16::MAX as u32 + ITERATION_BIAS).contains(&self.iterations) {
            return Err(VaultError::Configuration("iteration count must be 1..=65536"));
        }
        Ok(())
    }

    /// The 6-byte record header for these parameters.
    pub fn header(&self) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        header[0] = SCHEME_PBKDF2_AES;
        header[1] = (self.salt_len - SALT_BIAS) as u8;
        header[2..4].copy_from_slice(&((self.key_len() - KEY_BIAS) as u16).to_be_bytes());
        header[4..6].copy_from_slice(&((self.iterations - ITERATION_BIAS) as u16).to_be_bytes());
        header
    }
}

/// Parsed verification record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRecord {
    pub params: KdfParams,
    pub salt: Vec<u8>,
    pub hash: [u8; HASH_LEN],
}

impl VerificationRecord {
    /// Build the record for a freshly derived key.
    pub fn seal(params: KdfParams, salt: &[u8], key: &[u8]) -> Self {
        let params = KdfParams {
            salt_len: salt.len(),
            ..params
        };
        let hash = key_digest(&params.header(), salt, key);
        Self {
            params,
            salt: salt.to_vec(),
            hash,
        }
    }

    pub fn parse(bytes: &[u8]) -> VaultResult<Self> {
        let corrupt = |msg: &str| VaultError::UnrecoverableFormat(msg.to_string());

        let header = bytes
            .get(..HEADER_LEN)
            .ok_or_else(|| corrupt("password record truncated"))?;
        if header[0] != SCHEME_PBKDF2_AES {
            return Err(VaultError::UnrecoverableFormat(format!(
                "unsupported encryption scheme {}",
                header[0]
            )));
        }

        let salt_len = header[1] as usize + SALT_BIAS;
        let key_len = u16::from_be_bytes([header[2], header[3]]) as usize + KEY_BIAS;
        let iterations = u16::from_be_bytes([header[4], header[5]]) as u32 + ITERATION_BIAS;

        let body = &bytes[HEADER_LEN..];
        if body.len() < salt_len + HASH_LEN {
            return Err(corrupt("password record truncated"));
        }
        if body.len() > salt_len + HASH_LEN {
            return Err(corrupt("password record has trailing bytes"));
        }
        if !AesTransform::supports_key_len(key_len) {
            return Err(VaultError::UnrecoverableFormat(format!(
                "unsupported key length {key_len}"
            )));
        }

        let (salt, stored) = body.split_at(salt_len);
        let mut hash = [0u8; HASH_LEN];
        hash.copy_from_slice(stored);

        Ok(Self {
            params: KdfParams {
                salt_len,
                key_bits: key_len * 8,
                iterations,
            },
            salt: salt.to_vec(),
            hash,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.salt.len() + HASH_LEN);
        out.extend_from_slice(&self.params.header());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.hash);
        out
    }

    /// Whether `key` hashes to the stored value, compared in constant time.
    pub fn matches(&self, key: &[u8]) -> bool {
        let candidate = key_digest(&self.params.header(), &self.salt, key);
        candidate
            .iter()
            .zip(self.hash.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

/// SHA-256 over `header | salt | key`.
fn key_digest(header: &[u8], salt: &[u8], key: &[u8]) -> [u8; HASH_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(header);
    hasher.update(salt);
    hasher.update(key);
    hasher.finalize().into()
}
