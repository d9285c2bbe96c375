/// Authentication Routes
///
/// Registration, login, token refresh, logout, password change and the
/// password reset pair. Handlers translate JSON to `AuthService` calls and
/// back; all decisions live in the service.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, AuthSession, AuthenticatedUser, TokenPair};
use crate::domain::{authorize, Permission, UserProfile};
use crate::error::{AppError, DatabaseError};

const TOKEN_TYPE: &str = "Bearer";

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Token pair plus the profile it was issued for
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserProfile,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            success: true,
            token: session.tokens.access_token,
            refresh_token: session.tokens.refresh_token,
            token_type: TOKEN_TYPE,
            expires_in: session.tokens.expires_in,
            user: session.user,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

impl From<TokenPair> for TokenResponse {
    fn from(tokens: TokenPair) -> Self {
        Self {
            success: true,
            token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: TOKEN_TYPE,
            expires_in: tokens.expires_in,
        }
    }
}

#[derive(Serialize)]
pub struct UserEnvelope {
    pub success: bool,
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

impl MessageResponse {
    fn ok(message: &'static str) -> Self {
        Self { success: true, message }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordResponse {
    pub success: bool,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
}

/// POST /auth/register
///
/// # Errors
/// - 400: invalid name, email or password
/// - 409: email already registered
/// - 503: store unavailable
pub async fn register(
    form: web::Json<RegisterRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let session = service
        .register(&form.name, &form.email, &form.password)
        .await?;

    Ok(HttpResponse::Created().json(AuthResponse::from(session)))
}

/// POST /auth/login
///
/// Unknown email and wrong password produce the same 401.
pub async fn login(
    form: web::Json<LoginRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let session = service.login(&form.email, &form.password).await?;
    Ok(HttpResponse::Ok().json(AuthResponse::from(session)))
}

/// POST /auth/refresh
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let tokens = service.refresh(&form.refresh_token).await?;
    Ok(HttpResponse::Ok().json(TokenResponse::from(tokens)))
}

/// GET /auth/me
pub async fn me(
    identity: web::ReqData<AuthenticatedUser>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    authorize(identity.role, Permission::ManageOwnAccount)?;

    let user = service
        .current_user(&identity)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("user".to_string()))?;

    Ok(HttpResponse::Ok().json(UserEnvelope { success: true, user }))
}

/// POST /auth/logout
///
/// Revokes every token issued to the caller so far, on all devices.
pub async fn logout(
    identity: web::ReqData<AuthenticatedUser>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    authorize(identity.role, Permission::ManageOwnAccount)?;

    service.logout(&identity).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::ok("Logged out successfully")))
}

/// PUT /auth/password
pub async fn change_password(
    identity: web::ReqData<AuthenticatedUser>,
    form: web::Json<ChangePasswordRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    authorize(identity.role, Permission::ManageOwnAccount)?;

    let session = service
        .change_password(&identity, &form.current_password, &form.new_password)
        .await?;

    Ok(HttpResponse::Ok().json(AuthResponse::from(session)))
}

/// POST /auth/forgot-password
///
/// Always 200 with the same message, whether or not the account exists.
pub async fn forgot_password(
    form: web::Json<ForgotPasswordRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let outcome = service.forgot_password(&form.email).await?;

    Ok(HttpResponse::Ok().json(ForgotPasswordResponse {
        success: true,
        message: "If that email is registered, a password reset link has been sent",
        reset_token: outcome.reset_token,
    }))
}

/// POST /auth/reset-password
pub async fn reset_password(
    form: web::Json<ResetPasswordRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    service.reset_password(&form.token, &form.password).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::ok("Password has been reset")))
}
