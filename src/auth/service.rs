/// Authentication flows
///
/// Registration, login, refresh, logout, password change and the password
/// reset state machine. Handlers in `routes::auth` only translate HTTP to
/// these calls and back; everything here is testable against the in-memory
/// store.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::claims::TokenKind;
use crate::auth::jwt::{issue_token_pair, TokenPair};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::auth::reset_token::{hash_token, ResetTicket};
use crate::auth::session::{AuthenticatedUser, SessionGate};
use crate::configuration::{Environment, JwtSettings, Settings};
use crate::domain::{User, UserProfile};
use crate::error::{AppError, AuthError};
use crate::user_store::UserRepository;
use crate::validators::{is_valid_name, normalize_email};

/// Tokens plus the profile they were issued for
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub tokens: TokenPair,
    pub user: UserProfile,
}

/// Result of a forgot-password request
///
/// `reset_token` is only ever populated outside production, and only when
/// the account exists.
#[derive(Debug, Clone, Default)]
pub struct ForgotPasswordOutcome {
    pub reset_token: Option<String>,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    gate: SessionGate,
    jwt: JwtSettings,
    reset_token_expiry: i64,
    environment: Environment,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, settings: &Settings) -> Self {
        Self {
            gate: SessionGate::new(users.clone(), settings.jwt.clone()),
            users,
            jwt: settings.jwt.clone(),
            reset_token_expiry: settings.password_reset.token_expiry,
            environment: settings.application.environment,
        }
    }

    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    fn session_for(&self, user: &User) -> Result<AuthSession, AppError> {
        Ok(AuthSession {
            tokens: issue_token_pair(user, &self.jwt)?,
            user: user.profile(),
        })
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AppError> {
        let name = is_valid_name(name)?;
        let email = normalize_email(email)?;
        let password_hash = hash_password(password)?;

        let user = User::new(name, email, password_hash);
        self.users.insert(&user).await?;

        tracing::info!(user_id = %user.id, "User registered successfully");
        self.session_for(&user)
    }

    /// Same error for unknown email and wrong password
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let email = normalize_email(email)?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "Login with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        tracing::info!(user_id = %user.id, "User logged in successfully");
        self.session_for(&user)
    }

    pub async fn current_user(
        &self,
        identity: &AuthenticatedUser,
    ) -> Result<Option<UserProfile>, AppError> {
        self.user_profile(identity.id).await
    }

    pub async fn user_profile(&self, id: Uuid) -> Result<Option<UserProfile>, AppError> {
        Ok(self.users.find_by_id(id).await?.map(|user| user.profile()))
    }

    /// Exchange a refresh token for a new pair stamped with the current `token_version`
    ///
    /// Every token-related failure collapses to `InvalidRefreshToken`; store
    /// errors pass through.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let user = match self.gate.resolve(refresh_token, TokenKind::Refresh).await {
            Ok(user) => user,
            Err(AppError::Auth(cause)) => {
                tracing::warn!(cause = %cause, "Refresh rejected");
                return Err(AuthError::InvalidRefreshToken.into());
            }
            Err(other) => return Err(other),
        };

        tracing::info!(user_id = %user.id, "Token refreshed successfully");
        issue_token_pair(&user, &self.jwt)
    }

    /// Revoke every outstanding token of the caller
    pub async fn logout(&self, identity: &AuthenticatedUser) -> Result<i64, AppError> {
        let version = self
            .users
            .increment_token_version(identity.id)
            .await?
            .ok_or(AuthError::UnknownSubject)?;

        tracing::info!(
            user_id = %identity.id,
            token_version = version,
            "User logged out, sessions revoked"
        );
        Ok(version)
    }

    /// Verify the current password, store the new one and revoke all other sessions
    pub async fn change_password(
        &self,
        identity: &AuthenticatedUser,
        current_password: &str,
        new_password: &str,
    ) -> Result<AuthSession, AppError> {
        let user = self
            .users
            .find_by_id(identity.id)
            .await?
            .ok_or(AuthError::UnknownSubject)?;

        if !verify_password(current_password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let password_hash = hash_password(new_password)?;
        let user = self
            .users
            .update_password(user.id, &password_hash)
            .await?
            .ok_or(AuthError::UnknownSubject)?;

        tracing::info!(
            user_id = %user.id,
            token_version = user.token_version,
            "Password changed, sessions revoked"
        );
        self.session_for(&user)
    }

    /// Start a password reset
    ///
    /// Succeeds the same way whether or not the account exists; a malformed
    /// email is treated like an unknown one.
    pub async fn forgot_password(&self, email: &str) -> Result<ForgotPasswordOutcome, AppError> {
        let email = match normalize_email(email) {
            Ok(email) => email,
            Err(e) => {
                tracing::info!(error = %e, "Password reset requested for malformed email");
                return Ok(ForgotPasswordOutcome::default());
            }
        };

        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                tracing::info!("Password reset requested for unknown email");
                return Ok(ForgotPasswordOutcome::default());
            }
        };

        let ticket = ResetTicket::generate(Utc::now(), self.reset_token_expiry);
        let stored = self
            .users
            .set_password_reset(user.id, &ticket.token_hash, ticket.expires_at)
            .await?;
        if !stored {
            tracing::info!(user_id = %user.id, "Password reset requested for vanished user");
            return Ok(ForgotPasswordOutcome::default());
        }

        tracing::info!(
            user_id = %user.id,
            expires_at = %ticket.expires_at,
            "Password reset ticket issued"
        );

        // TODO: hand the secret to the email dispatcher once one exists
        let reset_token = if self.environment.is_production() {
            None
        } else {
            Some(ticket.secret)
        };

        Ok(ForgotPasswordOutcome { reset_token })
    }

    /// Consume a reset secret: set the new password and revoke every session
    pub async fn reset_password(&self, secret: &str, new_password: &str) -> Result<(), AppError> {
        validate_password_strength(new_password)?;

        let secret = secret.trim();
        if secret.is_empty() {
            return Err(AuthError::InvalidResetToken.into());
        }

        let password_hash = hash_password(new_password)?;
        let user = self
            .users
            .consume_password_reset(&hash_token(secret), &password_hash, Utc::now())
            .await?
            .ok_or_else(|| {
                tracing::warn!("Reset attempted with unknown or expired ticket");
                AuthError::InvalidResetToken
            })?;

        tracing::info!(
            user_id = %user.id,
            token_version = user.token_version,
            "Password reset, sessions revoked"
        );
        Ok(())
    }
}
