use sha2::{Digest, Sha256};
use std::fmt;

// Raw address used when no client address can be resolved
pub const UNKNOWN_CLIENT: &str = "unknown";

// Opaque, irreversible key for a client address (sha256 hex)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityToken(String);

impl IdentityToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Hash the raw client address before it is stored anywhere
pub fn hash_identity(raw: &str) -> IdentityToken {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    IdentityToken(format!("{:x}", hasher.finalize()))
}
