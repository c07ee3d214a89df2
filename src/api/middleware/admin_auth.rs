//! Request guard for admin routes

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::subject::{Permission, Subject, SubjectKind};
use crate::domain::DomainError;

use super::user_auth::authorize;

/// Extractor that requires a valid admin access token.
///
/// Admin tokens verify against the admin signing key, so a user token can
/// never pass this gate. Beyond the shared live checks the resolved subject
/// must be of the admin kind.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Subject);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let subject = authorize(&parts.headers, state, SubjectKind::Admin).await?;

        if subject.kind() != SubjectKind::Admin {
            return Err(ApiError::forbidden(
                "Access denied. Admin privileges required.",
            ));
        }

        Ok(RequireAdmin(subject))
    }
}

/// Require the admin to hold at least one of the given capabilities.
/// `super_admin` implicitly holds all of them.
pub fn ensure_permission(admin: &Subject, permissions: &[Permission]) -> Result<(), ApiError> {
    if permissions.iter().any(|p| admin.has_permission(*p)) {
        return Ok(());
    }

    let wanted: Vec<&str> = permissions.iter().map(|p| p.as_str()).collect();
    Err(DomainError::insufficient_permission(wanted.join(", ")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subject::{Role, SubjectId};

    fn admin_with(permissions: Vec<Permission>) -> Subject {
        Subject::new_admin(
            SubjectId::generate(),
            "storeadmin",
            "hash",
            Role::Admin,
            permissions,
        )
    }

    #[test]
    fn test_permission_granted() {
        let admin = admin_with(vec![Permission::ManageUsers]);
        assert!(ensure_permission(&admin, &[Permission::ManageUsers]).is_ok());
    }

    #[test]
    fn test_any_of_set_suffices() {
        let admin = admin_with(vec![Permission::ViewAnalytics]);
        assert!(
            ensure_permission(&admin, &[Permission::ManageOrders, Permission::ViewAnalytics])
                .is_ok()
        );
    }

    #[test]
    fn test_permission_denied() {
        let admin = admin_with(vec![Permission::ManageProducts]);
        let err = ensure_permission(&admin, &[Permission::ManageAdmins]).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_super_admin_bypasses() {
        let root = Subject::new_admin(
            SubjectId::generate(),
            "root",
            "hash",
            Role::SuperAdmin,
            Vec::new(),
        );

        assert!(ensure_permission(&root, &[Permission::ManageAdmins]).is_ok());
    }
}
