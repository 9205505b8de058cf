//! Deterministic string hashes used by world generation.
//!
//! Both hashes run a 31-multiplier rolling step over the UTF-16 code units of
//! the key with wrapping 32-bit arithmetic, so a seed reproduces the same
//! world on every platform. The result is the absolute value of the final
//! signed 32-bit state.

/// Rolls `hash = hash * 31 + unit` over the key's UTF-16 code units.
fn rolling(key: &str) -> u32 {
    key.encode_utf16().fold(0u32, |hash, unit| {
        hash.wrapping_mul(31).wrapping_add(u32::from(unit))
    })
}

/// Absolute value of the state reinterpreted as a signed 32-bit integer.
fn signed_abs(state: u32) -> u32 {
    (state as i32).unsigned_abs()
}

/// Simple rolling hash, used for tile background variation.
#[must_use]
pub fn simple_hash(key: &str) -> u32 {
    signed_abs(rolling(key))
}

/// Rolling hash followed by an avalanche mix, used for entity placement.
#[must_use]
pub fn avalanche_hash(key: &str) -> u32 {
    let mut h = rolling(key);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    signed_abs(h)
}

/// Hash key for a tile's background variation.
#[must_use]
pub fn tile_key(seed: u64, tile_x: i32, tile_y: i32) -> String {
    format!("{seed}-{tile_x}-{tile_y}")
}

/// Hash key for an entity placement decision.
///
/// `salted_seed` is the world seed plus the profile's hash salt.
#[must_use]
pub fn placement_key(salted_seed: i64, label: &str, tile_x: i32, tile_y: i32) -> String {
    format!("{salted_seed}-{label}-{tile_x}-{tile_y}")
}
