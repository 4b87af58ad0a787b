// ============================================================================
// src/crypto/mod.rs – primitives under the vault: HMAC, PBKDF2, AES adapter
// ============================================================================

pub mod block;
pub mod cipher;
pub mod hmac;
pub mod kdf;

pub use block::{AesTransform, BlockTransform, AES_BLOCK_SIZE};
pub use cipher::{pkcs7_decrypt, pkcs7_encrypt, BlockCipherAdapter, CipherSession, Direction};
pub use hmac::{hmac_sha256, HmacEngine, HmacKeyedState, MAC_LEN};
pub use kdf::{password_bytes, pbkdf2_hmac_sha256, Pbkdf2};
