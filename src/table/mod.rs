//! Hash Table Module
//!
//! Fixed-bucket chained hash map holding every key/value pair of the store.
//!
//! ## Responsibilities
//! - Map keys to one of `TABLE_SIZE` buckets
//! - Keep keys unique within a collision chain
//! - Copy values out on read so callers never alias table storage
//! - Enumerate pairs in bucket order, newest-first within a chain
//!
//! ## Layout
//! ```text
//!  bucket 0 ─► ("apple", ..) ─► ("avocado", ..) ─► ∅
//!  bucket 1 ─► ∅
//!  ...
//!  bucket 35 ─► ("9lives", ..) ─► ∅
//! ```
//!
//! The table never resizes. With [`BucketStrategy::FirstChar`] the bucket is
//! picked by a key's first character, so distribution follows the key set.
//!
//! [`BucketStrategy::FirstChar`]: crate::config::BucketStrategy::FirstChar

mod bucket;
mod hash_table;

pub use bucket::{bucket_index, fnv1a_hash, TABLE_SIZE};
pub use hash_table::{HashTable, Iter};
