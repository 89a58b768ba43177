//! Hash functions that decide bucket and ring positions.
//!
//! Both functions are fixed: placement is only deterministic across runs
//! (and across processes) as long as these stay bit-for-bit identical.

/// Seed of the DJB2 accumulator.
const DJB2_SEED: u32 = 5381;

/// Multiplier of the integer finalizer.
const MIX_MULTIPLIER: u32 = 0x045d_9f3b;

/// DJB2 string hash: `h = h * 33 + byte`, seeded with 5381.
///
/// Arithmetic wraps at 32 bits. Every byte of `bytes` is consumed, so keys
/// must not rely on an embedded terminator.
pub fn djb2(bytes: &[u8]) -> u32 {
    bytes.iter().fold(DJB2_SEED, |hash, &b| {
        (hash << 5).wrapping_add(hash).wrapping_add(u32::from(b))
    })
}

/// Three-round xor-multiply-shift finalizer for small integers.
///
/// Sequential ids (1, 2, 3, ...) land far apart after mixing, which is what
/// spreads a server's replicas around the ring.
pub fn mix_u32(x: u32) -> u32 {
    let x = ((x >> 16) ^ x).wrapping_mul(MIX_MULTIPLIER);
    let x = ((x >> 16) ^ x).wrapping_mul(MIX_MULTIPLIER);
    (x >> 16) ^ x
}
