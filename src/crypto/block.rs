// ============================================================================
// src/crypto/block.rs – keyed fixed-block permutation (AES)
// ============================================================================

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};

use crate::error::CryptoError;

/// AES block size in bytes.
pub const AES_BLOCK_SIZE: usize = 16;

/// A keyed permutation over fixed-size blocks.
///
/// Implementations transform exactly one block in place; buffering and
/// padding live in [`crate::crypto::cipher::BlockCipherAdapter`].
pub trait BlockTransform {
    fn block_size(&self) -> usize;
    fn encrypt_block(&self, block: &mut [u8]);
    fn decrypt_block(&self, block: &mut [u8]);
}

/// AES with the key size picked from the key length (16, 24 or 32 bytes).
pub enum AesTransform {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl AesTransform {
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let invalid = |_| CryptoError::InvalidKeyLength(key.len());
        match key.len() {
            16 => Aes128::new_from_slice(key).map(Self::Aes128).map_err(invalid),
            24 => Aes192::new_from_slice(key).map(Self::Aes192).map_err(invalid),
            32 => Aes256::new_from_slice(key).map(Self::Aes256).map_err(invalid),
            other => Err(CryptoError::InvalidKeyLength(other)),
        }
    }

    /// Whether `len` bytes is a usable AES key.
    pub fn supports_key_len(len: usize) -> bool {
        matches!(len, 16 | 24 | 32)
    }
}

impl BlockTransform for AesTransform {
    fn block_size(&self) -> usize {
        AES_BLOCK_SIZE
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Self::Aes128(c) => c.encrypt_block(block),
            Self::Aes192(c) => c.encrypt_block(block),
            Self::Aes256(c) => c.encrypt_block(block),
        }
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Self::Aes128(c) => c.decrypt_block(block),
            Self::Aes192(c) => c.decrypt_block(block),
            Self::Aes256(c) => c.decrypt_block(block),
        }
    }
}
