// src/artifact/hash.rs

use blake3::Hasher;

/// Content hash of an artifact: blake3 over the raw bytes, lowercase hex.
///
/// Pure function of `bytes`; two artifacts with equal hashes are treated as
/// the same content.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize().to_hex().to_string()
}

/// 64-bit digest of an item name, used for registry fingerprints.
pub fn name_digest(item_name: &str) -> u64 {
    let digest = blake3::hash(item_name.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(head)
}
