// ============================================================================
// src/error.rs – error taxonomy for the crypto primitives and the vault
// ============================================================================

use thiserror::Error;

use crate::store::StoreError;

/// Failures raised by the keyed primitives (HMAC, PBKDF2, block transform).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("iteration count must be at least 1")]
    InvalidIterationCount,

    #[error("unsupported key length: {0} bytes")]
    InvalidKeyLength(usize),
}

/// Failures raised by the streaming block cipher adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// Input cannot be processed in the current mode (e.g. unaligned data
    /// without padding).
    #[error("data length error: {0}")]
    DataLength(&'static str),

    /// Final ciphertext was not a whole number of blocks.
    #[error("illegal block size: {0}")]
    IllegalBlockSize(&'static str),

    /// PKCS#7 padding did not validate.
    #[error("pad block corrupted")]
    BadPadding,

    #[error("cipher has not been initialized")]
    Uninitialized,

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Caller-facing failures of [`crate::vault::PasswordVault`].
///
/// Decrypt failures of every kind collapse into [`VaultError::WrongPassword`]
/// so the caller never learns which check tripped.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Password or salt missing for an operation that needs them.
    #[error("vault misconfigured: {0}")]
    Configuration(&'static str),

    /// The verification record could not be parsed.
    #[error("corrupt data: {0}")]
    UnrecoverableFormat(String),

    #[error("bad password")]
    WrongPassword,

    /// `remove_password` called while payloads are still encrypted.
    #[error("{remaining} records are still encrypted")]
    PreconditionViolation { remaining: usize },

    #[error("failed to generate random bytes: {0}")]
    Entropy(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

pub type VaultResult<T> = Result<T, VaultError>;
