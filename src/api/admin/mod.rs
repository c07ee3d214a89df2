//! Admin session and management endpoints
//!
//! The session flows mirror the user surface but run against the admin
//! signing key. Management endpoints gate on capability tags and carry the
//! ledger side effects the token lifecycle depends on: deactivating or
//! deleting a subject revokes every session it owns.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::middleware::{device_context, ensure_permission, RequireAdmin};
use crate::api::session::{
    end_all_sessions, end_session, rotate_session, LogoutRequest, MessageResponse,
    RefreshRequest, SessionResponse, TokensResponse,
};
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, SubjectResponse};
use crate::domain::subject::{Permission, Role, Subject, SubjectId, SubjectKind};
use crate::domain::DomainError;
use crate::infrastructure::subject::CreateAdminRequest as CreateAdminServiceRequest;

/// Create the admin router
pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .route("/logout", post(logout))
        .route("/logout-all", post(logout_all))
        .route("/change-password", put(change_password))
        .route("/admins", post(create_admin))
        .route("/users/{id}/deactivate", put(deactivate_user))
        .route("/users/{id}/activate", put(activate_user))
        .route("/users/{id}", delete(delete_user))
        .route("/tokens/cleanup", post(cleanup_tokens))
}

/// Admin login request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

/// Admin password change request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Admin creation request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdminRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// Subject envelope for management responses
#[derive(Debug, Serialize)]
pub struct SubjectEnvelope {
    pub success: bool,
    pub message: String,
    pub subject: SubjectResponse,
}

impl SubjectEnvelope {
    fn new(message: impl Into<String>, subject: &Subject) -> Self {
        Self {
            success: true,
            message: message.into(),
            subject: SubjectResponse::from_subject(subject),
        }
    }
}

/// Sweep result for the token cleanup endpoint
#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub removed: u64,
}

/// Admin login with username and password
///
/// POST /admin/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AdminLoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let subject = state
        .subject_service
        .authenticate(SubjectKind::Admin, &request.username, &request.password)
        .await
        .map_err(|e| match e {
            DomainError::CredentialMismatch => {
                ApiError::unauthorized("Invalid username or password")
            }
            other => other.into(),
        })?;

    let tokens = state
        .token_service
        .issue_pair(subject.id(), subject.role(), device_context(&headers))
        .await?;

    Ok(Json(SessionResponse::new(
        "Admin login successful",
        &subject,
        tokens,
    )))
}

/// Redeem an admin refresh token
///
/// POST /admin/refresh-token
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokensResponse>, ApiError> {
    let response = rotate_session(
        &state,
        &headers,
        request.refresh_token.as_deref(),
        SubjectKind::Admin,
    )
    .await?;

    Ok(Json(response))
}

/// Invalidate the presented refresh token
///
/// POST /admin/logout
pub async fn logout(
    RequireAdmin(_subject): RequireAdmin,
    State(state): State<AppState>,
    body: Result<Json<LogoutRequest>, crate::api::types::json::JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let refresh_token = body.ok().and_then(|b| b.into_inner().refresh_token);

    let response = end_session(&state, refresh_token.as_deref()).await?;
    Ok(Json(response))
}

/// Invalidate every session the admin owns
///
/// POST /admin/logout-all
pub async fn logout_all(
    RequireAdmin(subject): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    let response = end_all_sessions(&state, &subject).await?;
    Ok(Json(response))
}

/// Change the admin's password, revoking every outstanding session
///
/// PUT /admin/change-password
pub async fn change_password(
    RequireAdmin(subject): RequireAdmin,
    State(state): State<AppState>,
    Json(request): Json<AdminChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .subject_service
        .change_password(
            subject.id(),
            &request.current_password,
            &request.new_password,
        )
        .await
        .map_err(|e| match e {
            DomainError::CredentialMismatch => {
                ApiError::unauthorized("Current password is incorrect")
            }
            other => other.into(),
        })?;

    state
        .token_service
        .invalidate_all_for_subject(subject.id())
        .await?;

    Ok(Json(MessageResponse::new(
        "Password changed successfully. Please login again.",
    )))
}

/// Create a new admin account. Requires `manage_admins`.
///
/// POST /admin/admins
pub async fn create_admin(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(request): Json<CreateAdminRequest>,
) -> Result<(StatusCode, Json<SubjectEnvelope>), ApiError> {
    ensure_permission(&admin, &[Permission::ManageAdmins])?;

    let subject = state
        .subject_service
        .create_admin(CreateAdminServiceRequest {
            username: request.username,
            password: request.password,
            role: request.role.unwrap_or(Role::Admin),
            permissions: request.permissions,
        })
        .await?;

    info!(admin = %admin.id(), created = %subject.id(), "Admin account created");

    Ok((
        StatusCode::CREATED,
        Json(SubjectEnvelope::new("Admin created successfully", &subject)),
    ))
}

/// Resolve a path ID to an existing user subject
async fn lookup_user(state: &AppState, id: &str) -> Result<Subject, ApiError> {
    let subject_id =
        SubjectId::new(id).map_err(|e| DomainError::invalid_id(e.to_string()))?;

    let subject = state
        .subject_service
        .get(&subject_id)
        .await?
        .filter(|s| s.kind() == SubjectKind::User)
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(subject)
}

/// Deactivate a user and revoke every session they own.
/// Requires `manage_users`.
///
/// PUT /admin/users/{id}/deactivate
pub async fn deactivate_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SubjectEnvelope>, ApiError> {
    ensure_permission(&admin, &[Permission::ManageUsers])?;

    let subject = lookup_user(&state, &id).await?;
    let subject = state.subject_service.deactivate(subject.id()).await?;

    // Deactivation kills every outstanding session immediately
    state
        .token_service
        .invalidate_all_for_subject(subject.id())
        .await?;

    info!(admin = %admin.id(), user = %subject.id(), "User deactivated");

    Ok(Json(SubjectEnvelope::new("User deactivated", &subject)))
}

/// Reactivate a user. Requires `manage_users`.
///
/// PUT /admin/users/{id}/activate
pub async fn activate_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SubjectEnvelope>, ApiError> {
    ensure_permission(&admin, &[Permission::ManageUsers])?;

    let subject = lookup_user(&state, &id).await?;
    let subject = state.subject_service.activate(subject.id()).await?;

    Ok(Json(SubjectEnvelope::new("User activated", &subject)))
}

/// Delete a user, revoking every session first. Requires `manage_users`.
///
/// DELETE /admin/users/{id}
pub async fn delete_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_permission(&admin, &[Permission::ManageUsers])?;

    let subject = lookup_user(&state, &id).await?;

    state
        .token_service
        .invalidate_all_for_subject(subject.id())
        .await?;
    state.subject_service.delete(subject.id()).await?;

    info!(admin = %admin.id(), user = %subject.id(), "User deleted");

    Ok(Json(MessageResponse::new("User deleted")))
}

/// Delete expired ledger records. Requires `manage_admins`.
///
/// POST /admin/tokens/cleanup
pub async fn cleanup_tokens(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<CleanupResponse>, ApiError> {
    ensure_permission(&admin, &[Permission::ManageAdmins])?;

    let removed = state.token_service.sweep_expired().await?;

    info!(admin = %admin.id(), removed, "Swept expired refresh tokens");

    Ok(Json(CleanupResponse {
        success: true,
        removed,
    }))
}
