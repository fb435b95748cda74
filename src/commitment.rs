// 🔒 Secret Commitment - one-way SHA-256 digests standing in for secrets
//
// Plaintext never leaves this module except through `Secret::expose`, and
// `Secret` never prints its contents.

use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a hex-encoded SHA-256 digest
pub const DIGEST_HEX_LEN: usize = 64;

/// Commit to a plaintext: lowercase hex SHA-256
pub fn commit(plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Does this value already have the exact shape `commit` produces?
///
/// Only lowercase hex is accepted, so an uppercase 64-hex string is treated
/// as plaintext and hashed.
pub fn is_digest(value: &str) -> bool {
    value.len() == DIGEST_HEX_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Check a plaintext against a stored commitment
pub fn verify(plaintext: &str, digest: &str) -> bool {
    let candidate = commit(plaintext);
    if candidate.len() != digest.len() {
        return false;
    }
    candidate
        .bytes()
        .zip(digest.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

// ============================================================================
// SECRET
// ============================================================================

/// Plaintext credential received at the boundary. Redacted in Debug/Display.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Hash unconditionally; a digest-shaped plaintext is still plaintext here
    pub fn commit(&self) -> String {
        commit(&self.0)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(\"**********\")")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("**********")
    }
}

// ============================================================================
// TESTS
// ============================================================================
