#![forbid(unsafe_code)]

use xxhash_rust::xxh64::xxh64;

/// Seed for every content hash, fixed so fingerprints stay comparable across runs and tools.
pub const HASH_SEED: u64 = 1222;

/// 64-bit content fingerprint of a blob. Not cryptographic.
pub fn content_hash(data: &[u8]) -> u64 {
    xxh64(data, HASH_SEED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_and_content_sensitive() {
        assert_eq!(content_hash(b"hello"), content_hash(b"hello"));
        assert_ne!(content_hash(b"hello"), content_hash(b"hellp"));
    }

    #[test]
    fn seeded() {
        assert_ne!(content_hash(b"hello"), xxh64(b"hello", 0));
    }
}
