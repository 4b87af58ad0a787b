// ============================================================================
// src/crypto/kdf.rs – PBKDF2-HMAC-SHA256 (PKCS #5 v2.0, scheme 2)
// ============================================================================

use zeroize::Zeroizing;

use crate::crypto::hmac::{HmacEngine, MAC_LEN};
use crate::error::CryptoError;

/// Explicit UTF-8 encoding of a password: no terminator, no padding.
pub fn password_bytes(password: &str) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(password.as_bytes().to_vec())
}

/// Key stretcher bound to one (password, salt, iteration count) triple.
pub struct Pbkdf2 {
    hmac: HmacEngine,
    salt: Vec<u8>,
    iterations: u32,
}

impl Pbkdf2 {
    pub fn new(password: &[u8], salt: &[u8], iterations: u32) -> Result<Self, CryptoError> {
        if iterations < 1 {
            return Err(CryptoError::InvalidIterationCount);
        }
        Ok(Self {
            hmac: HmacEngine::new(password),
            salt: salt.to_vec(),
            iterations,
        })
    }

    /// Derive `ceil(key_size_bits / 8)` bytes.
    pub fn generate(&mut self, key_size_bits: usize) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(vec![0u8; key_size_bits.div_ceil(8)]);
        self.fill(&mut out);
        out
    }

    /// Fill `out` with derived key material.
    pub fn fill(&mut self, out: &mut [u8]) {
        for (index, chunk) in out.chunks_mut(MAC_LEN).enumerate() {
            // Block counter starts at 1.
            let counter = (index as u32).wrapping_add(1);
            let block = self.block(counter);
            chunk.copy_from_slice(&block[..chunk.len()]);
        }
    }

    fn block(&mut self, counter: u32) -> Zeroizing<[u8; MAC_LEN]> {
        let mut u = Zeroizing::new([0u8; MAC_LEN]);
        self.hmac.update(&self.salt);
        self.hmac.update(&counter.to_be_bytes());
        self.hmac.do_final(&mut u);

        let mut result = u.clone();
        for _ in 1..self.iterations {
            self.hmac.update(&u[..]);
            self.hmac.do_final(&mut u);
            for (r, x) in result.iter_mut().zip(u.iter()) {
                *r ^= x;
            }
        }
        result
    }
}

/// Convenience wrapper filling `out` in one call.
pub fn pbkdf2_hmac_sha256(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    out: &mut [u8],
) -> Result<(), CryptoError> {
    Pbkdf2::new(password, salt, iterations)?.fill(out);
    Ok(())
}
