// ============================================================================
// src/crypto/hmac.rs – HMAC-SHA256 with precomputed keyed states (RFC 2104)
// ============================================================================

use sha2::digest::generic_array::GenericArray;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

/// SHA-256 input block length.
pub const HASH_BLOCK_LEN: usize = 64;
/// SHA-256 digest length, which is also the MAC length.
pub const MAC_LEN: usize = 32;

const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

/// The two hash states that depend only on the key.
///
/// `message_state` has absorbed `key ^ ipad` and is where every message
/// starts; `finalize_state` has absorbed `key ^ opad` and wraps the inner
/// digest. Both are built once per key and never mutated afterwards.
#[derive(Clone)]
pub struct HmacKeyedState {
    message_state: Sha256,
    finalize_state: Sha256,
}

impl HmacKeyedState {
    pub fn new(key: &[u8]) -> Self {
        let mut key_block = Zeroizing::new([0u8; HASH_BLOCK_LEN]);
        if key.len() > HASH_BLOCK_LEN {
            let mut digest = Sha256::digest(key);
            key_block[..MAC_LEN].copy_from_slice(&digest);
            digest.as_mut_slice().zeroize();
        } else {
            key_block[..key.len()].copy_from_slice(key);
        }

        let mut pad = Zeroizing::new([0u8; HASH_BLOCK_LEN]);

        for (p, k) in pad.iter_mut().zip(key_block.iter()) {
            *p = k ^ IPAD;
        }
        let mut message_state = Sha256::new();
        message_state.update(&pad[..]);

        for (p, k) in pad.iter_mut().zip(key_block.iter()) {
            *p = k ^ OPAD;
        }
        let mut finalize_state = Sha256::new();
        finalize_state.update(&pad[..]);

        Self {
            message_state,
            finalize_state,
        }
    }

    /// A fresh hash positioned at the start of a message.
    pub fn begin(&self) -> Sha256 {
        self.message_state.clone()
    }

    /// Finish the message absorbed by `live` into `out`, leaving `live`
    /// rewound to the start of the next message.
    pub fn finalize_into(&self, live: &mut Sha256, out: &mut [u8; MAC_LEN]) {
        let mut scratch = Zeroizing::new([0u8; MAC_LEN]);
        live.finalize_into_reset(GenericArray::from_mut_slice(&mut scratch[..]));

        let mut outer = self.finalize_state.clone();
        outer.update(&scratch[..]);
        outer.finalize_into(GenericArray::from_mut_slice(&mut out[..]));

        *live = self.begin();
    }
}

/// Streaming HMAC-SHA256 that can be reused for many messages under one key.
///
/// `update` any number of times, then `do_final`; the engine is immediately
/// ready for the next message.
pub struct HmacEngine {
    keyed: HmacKeyedState,
    live: Sha256,
}

impl HmacEngine {
    pub fn new(key: &[u8]) -> Self {
        let keyed = HmacKeyedState::new(key);
        let live = keyed.begin();
        Self { keyed, live }
    }

    /// Re-key the engine, discarding any partially absorbed message.
    pub fn init(&mut self, key: &[u8]) {
        self.keyed = HmacKeyedState::new(key);
        self.live = self.keyed.begin();
    }

    pub fn mac_size(&self) -> usize {
        MAC_LEN
    }

    pub fn update(&mut self, data: &[u8]) {
        self.live.update(data);
    }

    pub fn do_final(&mut self, out: &mut [u8; MAC_LEN]) {
        self.keyed.finalize_into(&mut self.live, out);
    }

    /// Drop the partially absorbed message.
    pub fn reset(&mut self) {
        self.live = self.keyed.begin();
    }
}

/// One-shot HMAC-SHA256.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; MAC_LEN] {
    let mut engine = HmacEngine::new(key);
    engine.update(data);
    let mut out = [0u8; MAC_LEN];
    engine.do_final(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 4231 test cases 1, 2 and 6
    #[test]
    fn rfc4231_short_key() {
        let mac = hmac_sha256(&[0x0b; 20], b"Hi There");
        assert_eq!(
            hex::encode(mac),
            "b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7"
        );
    }

    #[test]
    fn rfc4231_text_key() {
        let mac = hmac_sha256(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            hex::encode(mac),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn rfc4231_key_longer_than_block() {
        let mac = hmac_sha256(
            &[0xaa; 131],
            b"Test Using Larger Than Block-Size Key - Hash Key First",
        );
        assert_eq!(
            hex::encode(mac),
            "60e431591ee0b67f0d8a26aacbf5b77f8e0bc6213728c5140546040f0ee37f54"
        );
    }

    #[test]
    fn immediate_final_authenticates_empty_message() {
        let mut engine = HmacEngine::new(b"key");
        let mut out = [0u8; MAC_LEN];
        engine.do_final(&mut out);
        assert_eq!(
            hex::encode(out),
            "5d5d139563c95b5967b9bd9a8c9b233a9dedb45072794cd232dc1b74832607d0"
        );
    }

    #[test]
    fn engine_is_reusable_after_final() {
        let mut engine = HmacEngine::new(b"Jefe");
        let mut first = [0u8; MAC_LEN];
        let mut second = [0u8; MAC_LEN];

        engine.update(b"what do ya ");
        engine.update(b"want for nothing?");
        engine.do_final(&mut first);

        engine.update(b"what do ya want for nothing?");
        engine.do_final(&mut second);

        assert_eq!(first, second);
        assert_eq!(first, hmac_sha256(b"Jefe", b"what do ya want for nothing?"));
    }

    #[test]
    fn reset_discards_partial_message() {
        let mut engine = HmacEngine::new(b"Jefe");
        engine.update(b"garbage");
        engine.reset();
        engine.update(b"what do ya want for nothing?");
        let mut out = [0u8; MAC_LEN];
        engine.do_final(&mut out);
        assert_eq!(out, hmac_sha256(b"Jefe", b"what do ya want for nothing?"));
    }

    #[test]
    fn init_rekeys_engine() {
        let mut engine = HmacEngine::new(b"first");
        engine.update(b"partial");
        engine.init(b"Jefe");
        engine.update(b"what do ya want for nothing?");
        let mut out = [0u8; MAC_LEN];
        engine.do_final(&mut out);
        assert_eq!(out, hmac_sha256(b"Jefe", b"what do ya want for nothing?"));
        assert_eq!(engine.mac_size(), 32);
    }

    #[test]
    fn keyed_state_can_drive_independent_messages() {
        let keyed = HmacKeyedState::new(b"Jefe");
        let mut a = keyed.begin();
        let mut b = keyed.begin();
        a.update(b"what do ya want for nothing?");
        b.update(b"Hi There");

        let mut out_a = [0u8; MAC_LEN];
        let mut out_b = [0u8; MAC_LEN];
        keyed.finalize_into(&mut a, &mut out_a);
        keyed.finalize_into(&mut b, &mut out_b);

        assert_eq!(out_a, hmac_sha256(b"Jefe", b"what do ya want for nothing?"));
        assert_eq!(out_b, hmac_sha256(b"Jefe", b"Hi There"));
    }
}
