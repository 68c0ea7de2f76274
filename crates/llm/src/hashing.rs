use sha2::{Digest, Sha256};

/// SHA-256 of the exact UTF-8 bytes of `text`, lowercase hex.
///
/// Used as the dedup key for stored embeddings, so it must never depend on
/// anything but the bytes themselves.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
