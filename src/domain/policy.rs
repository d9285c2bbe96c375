/// Authorization policy
///
/// Role checks live here and only here. Routes ask for a permission,
/// never compare roles themselves.

use crate::domain::Role;
use crate::error::{AppError, AuthError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Read own profile and manage own sessions
    ManageOwnAccount,
    /// Look up any user's profile
    ViewAnyUser,
}

impl Role {
    pub fn permits(&self, permission: Permission) -> bool {
        match permission {
            Permission::ManageOwnAccount => true,
            Permission::ViewAnyUser => matches!(self, Role::Admin),
        }
    }
}

/// Fail with `Forbidden` unless `role` carries `permission`
pub fn authorize(role: Role, permission: Permission) -> Result<(), AppError> {
    if role.permits(permission) {
        Ok(())
    } else {
        tracing::warn!(role = %role, permission = ?permission, "Permission denied");
        Err(AppError::Auth(AuthError::Forbidden))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_everyone_manages_own_account() {
        for role in [Role::User, Role::Premium, Role::Admin] {
            assert!(authorize(role, Permission::ManageOwnAccount).is_ok());
        }
    }

    #[test]
    fn test_only_admin_views_any_user() {
        let err = authorize(Role::Premium, Permission::ViewAnyUser).unwrap_err();
        assert_eq!(err.auth_error(), Some(&AuthError::Forbidden));
        assert!(authorize(Role::Admin, Permission::ViewAnyUser).is_ok());
    }
}
