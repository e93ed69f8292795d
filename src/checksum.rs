//! Registry entry hashes

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA256 hex digest stored in a registry entry's `hash` field.
///
/// Entries appended by item creation carry an empty placeholder; a full
/// rebuild fills in the digest of the slug.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(String);

impl ContentHash {
    /// Digest of a slug's UTF-8 bytes
    pub fn of_slug(slug: &str) -> Self {
        Self::from_bytes(slug.as_bytes())
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(data)))
    }

    /// The empty placeholder
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this hash matches `slug`
    pub fn verify(&self, slug: &str) -> bool {
        *self == Self::of_slug(slug)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ContentHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContentHash {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_hash_is_sha256_hex() {
        let hash = ContentHash::of_slug("abc");
        assert_eq!(
            hash.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(hash.verify("abc"));
        assert!(!hash.verify("abd"));
    }

    #[test]
    fn test_empty_placeholder() {
        let hash = ContentHash::empty();
        assert!(hash.is_empty());
        assert!(!hash.verify(""));
        assert_eq!(hash.to_string(), "");
    }
}
