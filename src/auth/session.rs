/// Session gate
///
/// Turns a raw `Authorization` header into an `AuthenticatedUser` or a
/// rejection. It does not depend on actix; `middleware::SessionMiddleware`
/// is a thin adapter around it.
///
/// A token is accepted iff its signature and expiry verify, its subject
/// still exists, and the embedded `ver` equals the subject's live
/// `token_version`.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::claims::TokenKind;
use crate::auth::jwt::decode_token;
use crate::configuration::JwtSettings;
use crate::domain::{Role, User};
use crate::error::{AppError, AuthError};
use crate::user_store::UserRepository;

/// Identity attached to a request that passed the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub token_version: i64,
}

impl From<&User> for AuthenticatedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            token_version: user.token_version,
        }
    }
}

/// Extract the token from a `Bearer <token>` header value
pub fn bearer_token(authorization: Option<&str>) -> Result<&str, AuthError> {
    authorization
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}

#[derive(Clone)]
pub struct SessionGate {
    users: Arc<dyn UserRepository>,
    jwt: JwtSettings,
}

impl SessionGate {
    pub fn new(users: Arc<dyn UserRepository>, jwt: JwtSettings) -> Self {
        Self { users, jwt }
    }

    /// Gate a request by its `Authorization` header value
    ///
    /// # Errors
    /// - `AuthError::MissingToken` if the header is absent or not a bearer token
    /// - `AuthError::InvalidToken` on bad signature, expiry, issuer or kind
    /// - `AuthError::UnknownSubject` if the user no longer exists
    /// - `AuthError::RevokedToken` if the user's `token_version` moved on
    /// - store errors are passed through untouched
    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
    ) -> Result<AuthenticatedUser, AppError> {
        let token = bearer_token(authorization)?;
        let user = self.resolve(token, TokenKind::Access).await?;
        Ok(AuthenticatedUser::from(&user))
    }

    /// Verify `token` as `kind` and load its live subject
    pub async fn resolve(&self, token: &str, kind: TokenKind) -> Result<User, AppError> {
        let claims = decode_token(token, kind, &self.jwt)?;
        let user_id = claims.user_id()?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UnknownSubject)?;

        if claims.ver != user.token_version {
            tracing::warn!(
                user_id = %user.id,
                token_version = claims.ver,
                current_version = user.token_version,
                kind = ?kind,
                "Rejected revoked token"
            );
            return Err(AuthError::RevokedToken.into());
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::issue_token;
    use crate::user_store::InMemoryUserRepository;

    fn jwt() -> JwtSettings {
        JwtSettings {
            access_secret: "test-access-secret-at-least-32-characters".to_string(),
            access_token_expiry: 900,
            refresh_secret: "test-refresh-secret-at-least-32-characters".to_string(),
            refresh_token_expiry: 3600,
            issuer: "test".to_string(),
        }
    }

    async fn gate_with_user() -> (SessionGate, Arc<InMemoryUserRepository>, User) {
        let repo = Arc::new(InMemoryUserRepository::new());
        let user = User::new(
            "Test".to_string(),
            "test@example.com".to_string(),
            "hash".to_string(),
        );
        repo.insert(&user).await.unwrap();
        (SessionGate::new(repo.clone(), jwt()), repo, user)
    }

    fn auth_err(result: Result<AuthenticatedUser, AppError>) -> AuthError {
        result.unwrap_err().auth_error().cloned().expect("expected auth error")
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert_eq!(bearer_token(None).unwrap_err(), AuthError::MissingToken);
        assert_eq!(bearer_token(Some("Bearer ")).unwrap_err(), AuthError::MissingToken);
        assert_eq!(bearer_token(Some("Basic dXNlcjpwYXNz")).unwrap_err(), AuthError::MissingToken);
        assert_eq!(bearer_token(Some("BearerToken")).unwrap_err(), AuthError::MissingToken);
    }

    #[tokio::test]
    async fn test_valid_token_passes() {
        let (gate, _, user) = gate_with_user().await;
        let token = issue_token(&user, TokenKind::Access, &jwt()).unwrap();

        let identity = gate
            .authenticate(Some(&format!("Bearer {}", token)))
            .await
            .unwrap();
        assert_eq!(identity.id, user.id);
        assert_eq!(identity.email, "test@example.com");
        assert_eq!(identity.token_version, 0);
    }

    #[tokio::test]
    async fn test_missing_header() {
        let (gate, _, _) = gate_with_user().await;
        assert_eq!(auth_err(gate.authenticate(None).await), AuthError::MissingToken);
    }

    #[tokio::test]
    async fn test_garbage_token() {
        let (gate, _, _) = gate_with_user().await;
        assert_eq!(
            auth_err(gate.authenticate(Some("Bearer not.a.jwt")).await),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let (gate, _, user) = gate_with_user().await;
        let token = issue_token(&user, TokenKind::Refresh, &jwt()).unwrap();
        assert_eq!(
            auth_err(gate.authenticate(Some(&format!("Bearer {}", token))).await),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn test_unknown_subject() {
        let (gate, _, _) = gate_with_user().await;
        let stranger = User::new("X".to_string(), "x@example.com".to_string(), "h".to_string());
        let token = issue_token(&stranger, TokenKind::Access, &jwt()).unwrap();

        assert_eq!(
            auth_err(gate.authenticate(Some(&format!("Bearer {}", token))).await),
            AuthError::UnknownSubject
        );
    }

    #[tokio::test]
    async fn test_token_is_revoked_after_version_bump() {
        let (gate, repo, user) = gate_with_user().await;
        let header = format!("Bearer {}", issue_token(&user, TokenKind::Access, &jwt()).unwrap());
        assert!(gate.authenticate(Some(&header)).await.is_ok());

        repo.increment_token_version(user.id).await.unwrap();

        assert_eq!(auth_err(gate.authenticate(Some(&header)).await), AuthError::RevokedToken);
    }

    #[tokio::test]
    async fn test_resolve_refresh_token() {
        let (gate, repo, user) = gate_with_user().await;
        let token = issue_token(&user, TokenKind::Refresh, &jwt()).unwrap();
        assert_eq!(gate.resolve(&token, TokenKind::Refresh).await.unwrap().id, user.id);

        repo.increment_token_version(user.id).await.unwrap();
        let err = gate.resolve(&token, TokenKind::Refresh).await.unwrap_err();
        assert_eq!(err.auth_error(), Some(&AuthError::RevokedToken));
    }
}
