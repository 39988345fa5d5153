use crate::constants::hash::{FNV1A64_OFFSET, FNV1A64_PRIME};

/// FNV-1a over raw bytes. Stable across toolchains and platforms.
pub fn stable_hash_bytes(bytes: &[u8]) -> u64 {
    let mut hash = FNV1A64_OFFSET;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV1A64_PRIME);
    }
    hash
}

/// FNV-1a of `value` mixed with `seed`.
pub fn stable_hash_str(seed: u64, value: &str) -> u64 {
    let mut hash = stable_hash_bytes(&seed.to_le_bytes());
    for byte in value.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV1A64_PRIME);
    }
    hash
}
