//! # SHA-256 Digests
//!
//! Two entry points: [`sha256_bytes_hex`] fingerprints uploaded document
//! content as-is, and [`sha256_digest`] hashes structured data after
//! canonicalization (document signatures).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// A 32-byte SHA-256 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Lowercase hex rendering (64 characters).
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// Digest of canonicalized structured data.
///
/// Accepts only `&CanonicalBytes` so that signature material cannot be
/// hashed from a non-deterministic serialization.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    hash(data.as_bytes())
}

/// Hex SHA-256 of raw bytes (uploaded file content).
pub fn sha256_bytes_hex(data: &[u8]) -> String {
    hash(data).to_hex()
}

fn hash(data: &[u8]) -> ContentDigest {
    let out = Sha256::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&out);
    ContentDigest(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_matches_known_vector() {
        assert_eq!(
            sha256_bytes_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn canonical_empty_object_matches_known_vector() {
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        assert_eq!(
            sha256_digest(&cb).to_hex(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn display_is_algorithm_prefixed() {
        let cb = CanonicalBytes::new(&serde_json::json!({"a": 1})).unwrap();
        let s = sha256_digest(&cb).to_string();
        assert!(s.starts_with("sha256:"));
        assert_eq!(s.len(), 7 + 64);
    }

    #[test]
    fn different_inputs_differ() {
        assert_ne!(sha256_bytes_hex(b"solicitud"), sha256_bytes_hex(b"informe"));
    }
}
