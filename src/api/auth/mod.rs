//! User session endpoints
//!
//! Registration, login with lockout bookkeeping, refresh rotation, logout,
//! and password change.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{device_context, RequireUser};
use crate::api::session::{
    end_all_sessions, end_session, rotate_session, LogoutRequest, MessageResponse,
    RefreshRequest, SessionResponse, TokensResponse,
};
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, SubjectResponse};
use crate::domain::subject::SubjectKind;
use crate::domain::DomainError;
use crate::infrastructure::subject::RegisterUserRequest;

/// Create the user session router
pub fn create_auth_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .route("/logout", post(logout))
        .route("/logout-all", post(logout_all))
        .route("/change-password", put(change_password))
        .route("/me", get(me))
}

/// Registration request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub mobile_number: String,
    #[serde(default)]
    pub name: Option<String>,
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub mobile_number: String,
    pub password: String,
}

/// Password change request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Authenticated subject envelope for `/me`
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub subject: SubjectResponse,
}

/// Register a new user and issue a first token pair
///
/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let subject = state
        .subject_service
        .register_user(RegisterUserRequest {
            mobile_number: request.mobile_number,
            name: request.name,
            password: request.password,
        })
        .await?;

    let tokens = state
        .token_service
        .issue_pair(subject.id(), subject.role(), device_context(&headers))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse::new(
            "User registered successfully",
            &subject,
            tokens,
        )),
    ))
}

/// Login with mobile number and password
///
/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let subject = state
        .subject_service
        .authenticate(SubjectKind::User, &request.mobile_number, &request.password)
        .await
        .map_err(|e| match e {
            DomainError::CredentialMismatch => {
                ApiError::unauthorized("Invalid mobile number or password")
            }
            other => other.into(),
        })?;

    let tokens = state
        .token_service
        .issue_pair(subject.id(), subject.role(), device_context(&headers))
        .await?;

    Ok(Json(SessionResponse::new("Login successful", &subject, tokens)))
}

/// Redeem a refresh token for a new pair
///
/// POST /auth/refresh-token
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokensResponse>, ApiError> {
    let response = rotate_session(
        &state,
        &headers,
        request.refresh_token.as_deref(),
        SubjectKind::User,
    )
    .await?;

    Ok(Json(response))
}

/// Invalidate the presented refresh token
///
/// POST /auth/logout
///
/// The body is optional; logout always succeeds.
pub async fn logout(
    RequireUser(_subject): RequireUser,
    State(state): State<AppState>,
    body: Result<Json<LogoutRequest>, crate::api::types::json::JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let refresh_token = body.ok().and_then(|b| b.into_inner().refresh_token);

    let response = end_session(&state, refresh_token.as_deref()).await?;
    Ok(Json(response))
}

/// Invalidate every session the user owns
///
/// POST /auth/logout-all
pub async fn logout_all(
    RequireUser(subject): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    let response = end_all_sessions(&state, &subject).await?;
    Ok(Json(response))
}

/// Change the password, revoking every outstanding session
///
/// PUT /auth/change-password
pub async fn change_password(
    RequireUser(subject): RequireUser,
    State(state): State<AppState>,
    Json(request): Json<ChangePasswordRequest>,
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

    // Force re-login everywhere
    state
        .token_service
        .invalidate_all_for_subject(subject.id())
        .await?;

    Ok(Json(MessageResponse::new(
        "Password changed successfully. Please login again.",
    )))
}

/// Current authenticated user
///
/// GET /auth/me
pub async fn me(RequireUser(subject): RequireUser) -> Result<Json<MeResponse>, ApiError> {
    Ok(Json(MeResponse {
        success: true,
        subject: SubjectResponse::from_subject(&subject),
    }))
}
