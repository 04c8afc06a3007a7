//! Credential Verifier
//! Mission: Salted password hashing and constant-time verification

use anyhow::{Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};

/// Hash a plaintext password for durable storage.
///
/// bcrypt salts per call, so hashing the same password twice yields
/// different digests. Fails only on internal algorithm failure.
pub fn hash_password(plaintext: &str) -> Result<String> {
    hash(plaintext, DEFAULT_COST).context("Failed to hash password")
}

/// Verify a plaintext password against a stored hash.
///
/// A mismatch is a normal `false`, never an error. A malformed stored
/// hash also verifies as `false` rather than surfacing a parse error,
/// so callers cannot distinguish the two.
pub fn validate_password(stored_hash: &str, plaintext: &str) -> bool {
    verify(plaintext, stored_hash).unwrap_or(false)
}
