/// Admin Routes
///
/// Gated by the session middleware; each handler then checks the caller's
/// role against the permission policy.

use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::auth::{AuthService, AuthenticatedUser};
use crate::domain::{authorize, Permission};
use crate::error::{AppError, DatabaseError};
use crate::routes::auth::UserEnvelope;

/// GET /admin/users/{id}
///
/// # Errors
/// - 403: caller lacks `ViewAnyUser`
/// - 404: no such user, or the id is not a UUID
pub async fn get_user(
    identity: web::ReqData<AuthenticatedUser>,
    path: web::Path<String>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    authorize(identity.role, Permission::ViewAnyUser)?;

    let not_found = || DatabaseError::NotFound(format!("user {}", path.as_str()));
    let id = Uuid::parse_str(path.as_str()).map_err(|_| not_found())?;
    let user = service.user_profile(id).await?.ok_or_else(not_found)?;

    tracing::info!(admin_id = %identity.id, user_id = %id, "Admin viewed user");
    Ok(HttpResponse::Ok().json(UserEnvelope { success: true, user }))
}
