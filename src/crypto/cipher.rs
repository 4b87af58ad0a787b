// ============================================================================
// src/crypto/cipher.rs – streaming block cipher adapter (ECB, optional PKCS#7)
// ============================================================================

use zeroize::{Zeroize, Zeroizing};

use crate::crypto::block::BlockTransform;
use crate::error::CipherError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

/// Per-call streaming state: direction, keyed transform and the pending
/// partial (or withheld) block.
pub struct CipherSession<T> {
    direction: Direction,
    transform: T,
    pending: Zeroizing<Vec<u8>>,
}

impl<T: BlockTransform> CipherSession<T> {
    fn new(direction: Direction, transform: T) -> Self {
        let capacity = transform.block_size() * 2;
        Self {
            direction,
            transform,
            pending: Zeroizing::new(Vec::with_capacity(capacity)),
        }
    }

    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    fn apply(&self, block: &mut [u8]) {
        match self.direction {
            Direction::Encrypt => self.transform.encrypt_block(block),
            Direction::Decrypt => self.transform.decrypt_block(block),
        }
    }
}

/// Turns a [`BlockTransform`] into a byte-stream cipher.
///
/// `Pkcs7` always withholds the last full block from `update` so `do_final`
/// can pad (encryption) or check and strip padding (decryption). `Unpadded`
/// emits every full block and rejects unaligned input at `do_final`.
pub enum BlockCipherAdapter<T> {
    Unpadded(Option<CipherSession<T>>),
    Pkcs7(Option<CipherSession<T>>),
}

impl<T: BlockTransform> BlockCipherAdapter<T> {
    pub fn unpadded() -> Self {
        Self::Unpadded(None)
    }

    pub fn pkcs7() -> Self {
        Self::Pkcs7(None)
    }

    pub fn is_padded(&self) -> bool {
        matches!(self, Self::Pkcs7(_))
    }

    pub fn is_initialized(&self) -> bool {
        self.session().is_some()
    }

    fn session(&self) -> Option<&CipherSession<T>> {
        match self {
            Self::Unpadded(s) | Self::Pkcs7(s) => s.as_ref(),
        }
    }

    fn slot(&mut self) -> &mut Option<CipherSession<T>> {
        match self {
            Self::Unpadded(s) | Self::Pkcs7(s) => s,
        }
    }

    /// Bind direction and key; any previous session is discarded.
    pub fn init(&mut self, direction: Direction, transform: T) {
        *self.slot() = Some(CipherSession::new(direction, transform));
    }

    /// Exact number of bytes the next `update(len bytes)` call returns.
    pub fn update_output_size(&self, len: usize) -> Result<usize, CipherError> {
        let session = self.session().ok_or(CipherError::Uninitialized)?;
        Ok(emittable(
            session.buffered() + len,
            session.transform.block_size(),
            self.is_padded(),
        ))
    }

    /// Bytes `do_final` would produce after feeding `len` more bytes. Exact
    /// for encryption, an upper bound for decryption.
    pub fn output_size(&self, len: usize) -> Result<usize, CipherError> {
        let session = self.session().ok_or(CipherError::Uninitialized)?;
        let bs = session.transform.block_size();
        let total = session.buffered() + len;
        let aligned = total - total % bs;
        Ok(match (self.is_padded(), session.direction) {
            (true, Direction::Encrypt) => aligned + bs,
            _ => aligned,
        })
    }

    /// Emit every completed block except a withheld one (PKCS#7).
    pub fn update(&mut self, input: &[u8]) -> Result<Zeroizing<Vec<u8>>, CipherError> {
        let mut out = Zeroizing::new(Vec::with_capacity(self.update_output_size(input.len())?));
        self.update_into(input, &mut out)?;
        Ok(out)
    }

    /// Flush the withheld data and return to the uninitialized state.
    pub fn do_final(&mut self) -> Result<Zeroizing<Vec<u8>>, CipherError> {
        let mut out = Zeroizing::new(Vec::with_capacity(self.output_size(0)?));
        self.finish_into(&mut out)?;
        Ok(out)
    }

    /// `update(input)` followed by `do_final()`, into one buffer sized up
    /// front. On error the partial output is wiped with the buffer.
    pub fn do_final_with(&mut self, input: &[u8]) -> Result<Zeroizing<Vec<u8>>, CipherError> {
        let mut out = Zeroizing::new(Vec::with_capacity(self.output_size(input.len())?));
        if let Err(e) = self.update_into(input, &mut out) {
            self.slot().take();
            return Err(e);
        }
        self.finish_into(&mut out)?;
        Ok(out)
    }

    /// `init`, then `do_final_with(input)`.
    pub fn process(
        &mut self,
        direction: Direction,
        transform: T,
        input: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CipherError> {
        self.init(direction, transform);
        self.do_final_with(input)
    }

    // `out` must have room for everything written; it never reallocates.
    fn update_into(&mut self, mut input: &[u8], out: &mut Vec<u8>) -> Result<(), CipherError> {
        let padded = self.is_padded();
        let session = self
            .slot()
            .as_mut()
            .ok_or(CipherError::Uninitialized)?;
        let bs = session.transform.block_size();

        let mut remaining = emittable(session.pending.len() + input.len(), bs, padded);
        while remaining > 0 {
            let start = out.len();
            let from_pending = session.pending.len().min(bs);
            let from_input = bs - from_pending;
            out.extend_from_slice(&session.pending[..from_pending]);
            out.extend_from_slice(&input[..from_input]);
            session.pending.drain(..from_pending);
            input = &input[from_input..];
            session.apply(&mut out[start..]);
            remaining -= bs;
        }
        // At most one block is left over, within the pending capacity.
        session.pending.extend_from_slice(input);
        Ok(())
    }

    fn finish_into(&mut self, out: &mut Vec<u8>) -> Result<(), CipherError> {
        let padded = self.is_padded();
        let session = self.slot().take().ok_or(CipherError::Uninitialized)?;
        match (padded, session.direction) {
            (false, _) => finish_unpadded(&session),
            (true, Direction::Encrypt) => finish_pad(&session, out),
            (true, Direction::Decrypt) => finish_unpad(&session, out),
        }
    }
}

fn emittable(total: usize, bs: usize, withhold_last: bool) -> usize {
    let leftover = total % bs;
    if withhold_last && leftover == 0 {
        total.saturating_sub(bs)
    } else {
        total - leftover
    }
}

fn finish_unpadded<T: BlockTransform>(session: &CipherSession<T>) -> Result<(), CipherError> {
    if !session.pending.is_empty() {
        return Err(CipherError::DataLength("data not block size aligned"));
    }
    Ok(())
}

fn finish_pad<T: BlockTransform>(
    session: &CipherSession<T>,
    out: &mut Vec<u8>,
) -> Result<(), CipherError> {
    let bs = session.transform.block_size();
    let mut rest: &[u8] = &session.pending;

    if rest.len() == bs {
        let start = out.len();
        out.extend_from_slice(rest);
        session.apply(&mut out[start..]);
        rest = &[];
    }

    let start = out.len();
    let pad = bs - rest.len();
    out.extend_from_slice(rest);
    out.resize(start + bs, pad as u8);
    session.apply(&mut out[start..]);
    Ok(())
}

fn finish_unpad<T: BlockTransform>(
    session: &CipherSession<T>,
    out: &mut Vec<u8>,
) -> Result<(), CipherError> {
    let bs = session.transform.block_size();
    if session.pending.len() != bs {
        return Err(CipherError::IllegalBlockSize(
            "last block incomplete in decryption",
        ));
    }

    let start = out.len();
    out.extend_from_slice(&session.pending);
    session.apply(&mut out[start..]);
    let block = &out[start..];

    let pad = block[bs - 1];
    let count = pad as usize;
    // Inspect every byte regardless of where the first mismatch is.
    let mut bad = u8::from(count == 0 || count > bs);
    let pad_start = bs.saturating_sub(count);
    for (i, &b) in block.iter().enumerate() {
        bad |= u8::from(i >= pad_start) & u8::from(b != pad);
    }
    if bad != 0 {
        out[start..].zeroize();
        out.truncate(start);
        return Err(CipherError::BadPadding);
    }

    let keep = start + bs - count;
    out[keep..].zeroize();
    out.truncate(keep);
    Ok(())
}

/// One-shot PKCS#7 encryption.
pub fn pkcs7_encrypt<T: BlockTransform>(transform: T, data: &[u8]) -> Result<Vec<u8>, CipherError> {
    let mut code = BlockCipherAdapter::pkcs7().process(Direction::Encrypt, transform, data)?;
    Ok(std::mem::take(&mut *code))
}

/// One-shot PKCS#7 decryption; the plaintext is wiped when dropped.
pub fn pkcs7_decrypt<T: BlockTransform>(
    transform: T,
    data: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CipherError> {
    BlockCipherAdapter::pkcs7().process(Direction::Decrypt, transform, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::block::{AesTransform, AES_BLOCK_SIZE};

    // PBKDF2-HMAC-SHA256("Secret123", 32 zero bytes, 1000, 256 bits)
    const SECRET123_KEY: &str = "724ccc5c07d555f4799e569a6cf00dfaf1f1b8b50a4795947610c9c6e20f0f94";

    fn aes() -> AesTransform {
        AesTransform::new(&hex::decode(SECRET123_KEY).unwrap()).unwrap()
    }

    fn encrypt(data: &[u8]) -> Vec<u8> {
        pkcs7_encrypt(aes(), data).unwrap()
    }

    fn decrypt(data: &[u8]) -> Result<Vec<u8>, CipherError> {
        pkcs7_decrypt(aes(), data).map(|p| p.to_vec())
    }

    /// Raw ECB encryption of already padded data.
    fn raw_encrypt(data: &[u8]) -> Vec<u8> {
        BlockCipherAdapter::unpadded()
            .process(Direction::Encrypt, aes(), data)
            .unwrap()
            .to_vec()
    }

    #[test]
    fn pinned_ciphertexts() {
        assert_eq!(hex::encode(encrypt(b"")), "cfd7cdfe6d375402e3dce44137a46a4d");
        assert_eq!(
            hex::encode(encrypt(b"Buy milk")),
            "ab1ddf0dff3008ad11a168ed6aa6938e"
        );
        assert_eq!(
            hex::encode(encrypt(b"0123456789abcdef")),
            "61478537cb13acea0c17bbf618d7d0f6cfd7cdfe6d375402e3dce44137a46a4d"
        );
    }

    #[test]
    fn round_trip_at_block_edges() {
        for len in [0usize, 1, 15, 16, 17, 31, 32, 33, 100] {
            let plain: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let cipher = encrypt(&plain);
            assert_eq!(cipher.len(), AES_BLOCK_SIZE * ((len + 1).div_ceil(AES_BLOCK_SIZE)));
            assert_eq!(decrypt(&cipher).unwrap(), plain, "len {len}");
        }
    }

    #[test]
    fn streaming_matches_one_shot_and_sizes_are_exact() {
        let plain: Vec<u8> = (0..77u8).collect();
        for direction in [Direction::Encrypt, Direction::Decrypt] {
            let input = match direction {
                Direction::Encrypt => plain.clone(),
                Direction::Decrypt => encrypt(&plain),
            };
            let mut cipher = BlockCipherAdapter::pkcs7();
            cipher.init(direction, aes());
            let mut out = Vec::new();
            for chunk in input.chunks(5) {
                let expected = cipher.update_output_size(chunk.len()).unwrap();
                let produced = cipher.update(chunk).unwrap();
                assert_eq!(produced.len(), expected);
                out.extend_from_slice(&produced);
            }
            assert!(cipher.output_size(0).unwrap() >= AES_BLOCK_SIZE);
            out.extend_from_slice(&cipher.do_final().unwrap());
            assert!(!cipher.is_initialized());

            match direction {
                Direction::Encrypt => assert_eq!(out, encrypt(&plain)),
                Direction::Decrypt => assert_eq!(out, plain),
            }
        }
    }

    #[test]
    fn last_full_block_is_withheld() {
        let mut cipher = BlockCipherAdapter::pkcs7();
        cipher.init(Direction::Encrypt, aes());
        assert_eq!(cipher.update(&[0u8; 16]).unwrap().len(), 0);
        assert_eq!(cipher.update(&[0u8; 1]).unwrap().len(), 16);
        assert_eq!(cipher.update(&[0u8; 15]).unwrap().len(), 0);
        assert_eq!(cipher.output_size(0).unwrap(), 32);
        assert_eq!(cipher.do_final().unwrap().len(), 32);
    }

    #[test]
    fn encrypt_output_size_matches_padding_rule() {
        let mut cipher = BlockCipherAdapter::pkcs7();
        cipher.init(Direction::Encrypt, aes());
        for len in [0usize, 1, 15, 16, 17, 32] {
            assert_eq!(
                cipher.output_size(len).unwrap(),
                AES_BLOCK_SIZE * (len + 1).div_ceil(AES_BLOCK_SIZE)
            );
        }
    }

    #[test]
    fn bad_padding_detected() {
        let mut block = [7u8; 16];
        block[15] = 0;
        assert_eq!(decrypt(&raw_encrypt(&block)), Err(CipherError::BadPadding));

        let block = [17u8; 16];
        assert_eq!(decrypt(&raw_encrypt(&block)), Err(CipherError::BadPadding));

        let mut block = [3u8; 16];
        block[13] = 2;
        assert_eq!(decrypt(&raw_encrypt(&block)), Err(CipherError::BadPadding));
    }

    #[test]
    fn full_pad_block_decrypts_to_empty() {
        assert_eq!(decrypt(&raw_encrypt(&[16u8; 16])).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn unaligned_or_empty_ciphertext_is_illegal() {
        let cipher = encrypt(b"Buy milk");
        assert!(matches!(
            decrypt(&cipher[..15]),
            Err(CipherError::IllegalBlockSize(_))
        ));
        assert!(matches!(decrypt(&[]), Err(CipherError::IllegalBlockSize(_))));
    }

    #[test]
    fn unpadded_requires_alignment() {
        let mut cipher = BlockCipherAdapter::unpadded();
        cipher.init(Direction::Encrypt, aes());
        assert_eq!(cipher.update(&[1u8; 20]).unwrap().len(), 16);
        assert!(matches!(cipher.do_final(), Err(CipherError::DataLength(_))));
        assert!(!cipher.is_initialized());
    }

    #[test]
    fn uninitialized_use_is_rejected() {
        let mut cipher: BlockCipherAdapter<AesTransform> = BlockCipherAdapter::pkcs7();
        assert_eq!(cipher.update(b"x"), Err(CipherError::Uninitialized));
        assert_eq!(cipher.do_final(), Err(CipherError::Uninitialized));
        assert_eq!(cipher.output_size(1), Err(CipherError::Uninitialized));
    }
}
