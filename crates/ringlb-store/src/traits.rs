//! Capability trait for store keys.

use std::cmp::Ordering;

use ringlb_types::hash;

/// How a store hashes and compares the byte keys it holds.
///
/// A store picks its policy once, at construction, through its type
/// parameter. Releasing entries needs no hook: owned bytes are dropped.
pub trait KeyPolicy: Default + Send + Sync {
    /// Hash a key. The store reduces it modulo its bucket count.
    fn hash(&self, key: &[u8]) -> u32;

    /// Total order over keys. Two keys are the same key iff `Equal`.
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;
}

/// Byte-string keys: DJB2 hash, lexicographic byte order.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringKeys;

impl KeyPolicy for StringKeys {
    fn hash(&self, key: &[u8]) -> u32 {
        hash::djb2(key)
    }

    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }
}

/// Integer keys encoded as 4 little-endian bytes.
///
/// Hashed with the integer mixer and ordered numerically. Keys of any other
/// length fall back to the byte-string rules so the policy stays total.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntKeys;

impl IntKeys {
    /// Encode an integer key the way this policy expects it.
    pub fn encode(value: u32) -> [u8; 4] {
        value.to_le_bytes()
    }

    fn decode(key: &[u8]) -> Option<u32> {
        key.try_into().ok().map(u32::from_le_bytes)
    }
}

impl KeyPolicy for IntKeys {
    fn hash(&self, key: &[u8]) -> u32 {
        match Self::decode(key) {
            Some(n) => hash::mix_u32(n),
            None => hash::djb2(key),
        }
    }

    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        match (Self::decode(a), Self::decode(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => a.cmp(b),
        }
    }
}
