/// JWT Token Generation and Validation
///
/// Access and refresh tokens are HS256 JWTs signed with separate secrets and
/// carrying independent lifetimes. Validation checks signature, issuer,
/// expiry (no leeway) and that the token is of the expected kind.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{Claims, TokenKind};
use crate::configuration::JwtSettings;
use crate::domain::User;
use crate::error::{AppError, AuthError};

/// Freshly minted access + refresh tokens
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

impl JwtSettings {
    fn secret_for(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => self.access_secret.as_bytes(),
            TokenKind::Refresh => self.refresh_secret.as_bytes(),
        }
    }

    fn expiry_for(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_token_expiry,
            TokenKind::Refresh => self.refresh_token_expiry,
        }
    }
}

/// Sign a token of `kind` for `user`
///
/// # Errors
/// Returns an internal error if encoding fails
pub fn issue_token(user: &User, kind: TokenKind, config: &JwtSettings) -> Result<String, AppError> {
    let claims = Claims::new(user, kind, config.expiry_for(kind), config.issuer.clone());

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret_for(kind)),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Sign an access token and a refresh token stamped with the user's current `token_version`
pub fn issue_token_pair(user: &User, config: &JwtSettings) -> Result<TokenPair, AppError> {
    Ok(TokenPair {
        access_token: issue_token(user, TokenKind::Access, config)?,
        refresh_token: issue_token(user, TokenKind::Refresh, config)?,
        expires_in: config.access_token_expiry,
    })
}

/// Verify a token of `kind` and return its claims
///
/// Does not consult the credential store; revocation is checked by the
/// session gate.
///
/// # Errors
/// `AuthError::InvalidToken` if the token is malformed, tampered with,
/// expired, from another issuer or of the other kind
pub fn decode_token(
    token: &str,
    kind: TokenKind,
    config: &JwtSettings,
) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    validation.leeway = 0;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret_for(kind)),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(kind = ?kind, "JWT validation error: {}", e);
        AuthError::InvalidToken
    })?;

    if claims.kind != kind {
        tracing::warn!(expected = ?kind, found = ?claims.kind, "Token presented as the wrong kind");
        return Err(AuthError::InvalidToken);
    }

    Ok(claims)
}
