//! Partition key resolution and key-to-partition hashing.

use sha2::{Digest, Sha256};

/// Sentinel key for orders whose customer cannot be identified.
pub const UNKNOWN_CUSTOMER_KEY: &str = "unknown-customer";

/// Maps a customer id to a stable partition key.
///
/// Pure and deterministic: the same customer always yields the same key,
/// which is what keeps a customer's events on one ordered partition.
pub fn resolve_order_partition_key(customer_id: &str) -> String {
    let trimmed = customer_id.trim();
    if trimmed.is_empty() {
        UNKNOWN_CUSTOMER_KEY.to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

/// Maps a partition key to a partition index in `0..partition_count`.
///
/// Uses a content hash rather than `std`'s randomized hasher so the mapping
/// is stable across processes and restarts.
pub fn partition_index_for(partition_key: &str, partition_count: u32) -> u32 {
    debug_assert!(partition_count > 0);
    let digest = Sha256::digest(partition_key.as_bytes());
    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    prefix % partition_count.max(1)
}
