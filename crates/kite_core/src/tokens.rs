//! crates/kite_core/src/tokens.rs
//!
//! Opaque credential generation and hashing.
//!
//! A credential is 16 random bytes rendered as 26 characters of unpadded
//! RFC 4648 base-32. Only the SHA-256 digest of that text is ever stored.

use chrono::{Duration, Utc};
use data_encoding::BASE32_NOPAD;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::domain::{Credential, CredentialRecord, Scope};
use crate::ports::{PortError, PortResult};

/// Number of random bytes behind every credential.
pub const TOKEN_ENTROPY_BYTES: usize = 16;

/// Length of the plain value handed to the client.
pub const TOKEN_PLAINTEXT_LENGTH: usize = 26;

/// Mints credentials from the operating system's random source.
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialIssuer;

impl CredentialIssuer {
    pub fn new() -> Self {
        Self
    }

    /// Issues a credential for `user_id` that expires `ttl` from now.
    pub fn issue(&self, user_id: i64, ttl: Duration, scope: Scope) -> PortResult<Credential> {
        issue_with(&mut OsRng, user_id, ttl, scope)
    }
}

/// Issues a credential drawing its entropy from `rng`.
pub fn issue_with<R: RngCore>(
    rng: &mut R,
    user_id: i64,
    ttl: Duration,
    scope: Scope,
) -> PortResult<Credential> {
    let mut random_bytes = [0u8; TOKEN_ENTROPY_BYTES];
    rng.try_fill_bytes(&mut random_bytes)
        .map_err(|e| PortError::CredentialGeneration(e.to_string()))?;

    let plaintext = encode_plaintext(&random_bytes);
    let record = CredentialRecord {
        hash: hash_token_plaintext(&plaintext),
        user_id,
        expiry: Utc::now() + ttl,
        scope,
    };

    Ok(Credential::new(plaintext, record))
}

/// The storage digest of a plain credential value.
pub fn hash_token_plaintext(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

/// Renders random bytes as unpadded RFC 4648 base-32.
fn encode_plaintext(bytes: &[u8]) -> String {
    BASE32_NOPAD.encode(bytes)
}
