//! Reversible obfuscation of the payload region.
//!
//! Applied to the payload only: on encode before the checksum is computed,
//! on decode after the checksum has been verified.  The XOR variant is
//! placeholder obfuscation shared with the gateway, **not** a security
//! boundary; anything that needs confidentiality must swap in a real
//! cipher behind [`PayloadCipher`].

use serde::{Deserialize, Serialize};

/// Length of the repeating XOR key.
pub const KEY_LEN: usize = 16;

/// Key provisioned on the bus-mimic gate variant and its gateway.
pub const DEFAULT_XOR_KEY: [u8; KEY_LEN] = [
    0x3A, 0x7B, 0x9F, 0x2E, 0x5D, 0x8C, 0x1A, 0x6F, 0x4E, 0xB3, 0xC7, 0x92, 0xD1, 0x5A, 0xE8, 0x4C,
];

/// An in-place, self-inverse payload transform.
pub trait PayloadCipher {
    /// Transform `payload` in place.  Applying it twice restores the input.
    fn apply(&self, payload: &mut [u8]);
}

/// Pass-through stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoCipher;

impl PayloadCipher for NoCipher {
    fn apply(&self, _payload: &mut [u8]) {}
}

/// Byte-wise XOR with a fixed repeating key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorCipher {
    key: [u8; KEY_LEN],
}

impl XorCipher {
    pub const fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }
}

impl Default for XorCipher {
    fn default() -> Self {
        Self::new(DEFAULT_XOR_KEY)
    }
}

impl PayloadCipher for XorCipher {
    fn apply(&self, payload: &mut [u8]) {
        xor_in_place(payload, &self.key);
    }
}

/// Runtime-selectable stage, chosen from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum CipherStage {
    #[default]
    None,
    Xor([u8; KEY_LEN]),
}

impl PayloadCipher for CipherStage {
    fn apply(&self, payload: &mut [u8]) {
        match self {
            Self::None => {}
            Self::Xor(key) => xor_in_place(payload, key),
        }
    }
}

/// Return `bytes` XOR-ed with the repeating `key`.  An empty key leaves
/// the input unchanged.
pub fn transform(bytes: &[u8], key: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    xor_in_place(&mut out, key);
    out
}

fn xor_in_place(data: &mut [u8], key: &[u8]) {
    if key.is_empty() {
        return;
    }
    for (byte, k) in data.iter_mut().zip(key.iter().cycle()) {
        *byte ^= k;
    }
}
