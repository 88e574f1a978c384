//! Metadata enrichment utilities.

use sha2::{Digest, Sha256};

/// Calculate SHA-256 hash of text.
pub fn calculate_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Stable chunk identifier: identical source, position and text always map
/// to the same id.
pub fn chunk_id(source: &str, position: u32, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b":");
    hasher.update(position.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}

/// 1-based inclusive line range covered by `text[start..end]`.
pub(crate) fn line_range(text: &str, start: usize, end: usize) -> (usize, usize) {
    let first = text[..start].matches('\n').count() + 1;
    let body = text[start..end].trim_end();
    (first, first + body.matches('\n').count())
}
