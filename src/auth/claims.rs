/// JWT Claims structure
///
/// Payload shared by access and refresh tokens. Besides the standard
/// RFC 7519 claims it carries the subject's role and the `token_version`
/// that was current when the token was minted. `ver` is mandatory: a token
/// without it does not deserialize and is therefore never accepted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Role, User};
use crate::error::{AppError, AuthError};

/// Which secret and lifetime a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    pub role: Role,
    /// Subject's `token_version` at issuance
    pub ver: i64,
    pub kind: TokenKind,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub iss: String,
    /// Unique token id
    pub jti: String,
}

impl Claims {
    /// Create claims for `user` that expire `expiry_seconds` from now
    pub fn new(user: &User, kind: TokenKind, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user.id.to_string(),
            role: user.role,
            ver: user.token_version,
            kind,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Extract user ID from claims
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Auth(AuthError::InvalidToken))
    }
}
