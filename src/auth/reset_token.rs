/// Password Reset Tickets
///
/// Reset secrets are:
/// - Cryptographically secure random 64-character alphanumeric strings
/// - Hashed with SHA-256 before storage (the plaintext is never persisted)
/// - Time-limited and consumed exactly once

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

const RESET_SECRET_LENGTH: usize = 64;

/// A freshly generated ticket: the raw secret for the caller and the
/// hash + expiry to persist
#[derive(Debug, Clone)]
pub struct ResetTicket {
    pub secret: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl ResetTicket {
    pub fn generate(now: DateTime<Utc>, expiry_seconds: i64) -> Self {
        let secret = generate_reset_secret();
        let token_hash = hash_token(&secret);
        Self {
            secret,
            token_hash,
            expires_at: now + Duration::seconds(expiry_seconds),
        }
    }
}

pub fn generate_reset_secret() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_SECRET_LENGTH)
        .map(char::from)
        .collect()
}

/// SHA-256 of `token`, lowercase hex
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
