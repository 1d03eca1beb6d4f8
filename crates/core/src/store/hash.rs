//! Content digests for stored assets.

use sha2::{Digest, Sha256};

/// Compute the hex SHA-256 digest of a payload.
pub fn content_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_stability() {
        assert_eq!(content_digest(b"logo"), content_digest(b"logo"));
    }

    #[test]
    fn test_digest_differs_by_content() {
        assert_ne!(content_digest(b"logo-a"), content_digest(b"logo-b"));
    }

    #[test]
    fn test_digest_format() {
        let digest = content_digest(b"");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
