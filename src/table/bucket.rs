//! Bucket indexing
//!
//! Maps a key to its bucket under the configured strategy.

use crate::config::BucketStrategy;

/// Number of buckets: 26 letters + 10 digits
pub const TABLE_SIZE: usize = 36;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Bucket index for `key`, or `None` if the strategy rejects it.
///
/// `FirstChar` is case-insensitive on the first character and rejects empty
/// keys and keys starting outside `[a-z0-9]`.
pub fn bucket_index(strategy: BucketStrategy, key: &str) -> Option<usize> {
    match strategy {
        BucketStrategy::FirstChar => {
            let first = key.bytes().next()?.to_ascii_lowercase();
            match first {
                b'a'..=b'z' => Some((first - b'a') as usize),
                b'0'..=b'9' => Some(26 + (first - b'0') as usize),
                _ => None,
            }
        }
        BucketStrategy::Fnv1a => Some(fnv1a_hash(key.as_bytes()) as usize % TABLE_SIZE),
    }
}

/// 32-bit FNV-1a
pub fn fnv1a_hash(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &b| {
        (hash ^ b as u32).wrapping_mul(FNV_PRIME)
    })
}
