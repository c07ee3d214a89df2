//! Session flows shared by the user and admin surfaces
//!
//! Refresh, logout, and logout-all behave identically for both kinds; the
//! routers differ only in which guard and signing key apply.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::api::middleware::device_context;
use crate::api::state::AppState;
use crate::api::types::{ApiError, SubjectResponse};
use crate::domain::subject::{Subject, SubjectId, SubjectKind};
use crate::domain::DomainError;
use crate::infrastructure::auth::TokenPair;

/// Request body for the refresh endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Request body for logout; the token is optional and logout always succeeds
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Plain success envelope
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Login/registration response: subject plus a fresh token pair
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub message: String,
    pub subject: SubjectResponse,
    pub tokens: TokenPair,
}

impl SessionResponse {
    pub fn new(message: impl Into<String>, subject: &Subject, tokens: TokenPair) -> Self {
        Self {
            success: true,
            message: message.into(),
            subject: SubjectResponse::from_subject(subject),
            tokens,
        }
    }
}

/// Refresh response: just the replacement pair
#[derive(Debug, Serialize)]
pub struct TokensResponse {
    pub success: bool,
    pub message: String,
    pub tokens: TokenPair,
}

/// Redeem a refresh token for a new pair.
///
/// The subject's live state is re-checked before rotation so a deactivated
/// or locked account cannot mint fresh access tokens, and the rotation
/// itself is single-use.
pub async fn rotate_session(
    state: &AppState,
    headers: &HeaderMap,
    refresh_token: Option<&str>,
    kind: SubjectKind,
) -> Result<TokensResponse, ApiError> {
    let token =
        refresh_token.ok_or_else(|| ApiError::bad_request("Refresh token is required"))?;

    let claims = state.token_service.verify_refresh_token(token).await?;

    // A refresh token minted for the other kind is as good as forged here
    if claims.role.kind() != kind {
        return Err(ApiError::unauthorized("Invalid or expired refresh token"));
    }

    let subject_id = SubjectId::new(claims.subject_id())
        .map_err(|_| ApiError::unauthorized("Invalid or expired refresh token"))?;

    let subject = state
        .subject_service
        .get(&subject_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Subject no longer exists."))?;

    if !subject.is_active() {
        return Err(DomainError::SubjectInactive.into());
    }

    if subject.is_locked() {
        return Err(DomainError::SubjectLocked.into());
    }

    let tokens = state
        .token_service
        .rotate(token, device_context(headers))
        .await?;

    Ok(TokensResponse {
        success: true,
        message: "Tokens refreshed successfully".to_string(),
        tokens,
    })
}

/// Invalidate one refresh token if the caller supplied one. Always
/// succeeds: logging out an absent or already-dead token is a no-op.
pub async fn end_session(
    state: &AppState,
    refresh_token: Option<&str>,
) -> Result<MessageResponse, ApiError> {
    if let Some(token) = refresh_token {
        state.token_service.invalidate(token).await?;
    }

    Ok(MessageResponse::new("Logged out successfully"))
}

/// Invalidate every ledger record the subject owns
pub async fn end_all_sessions(
    state: &AppState,
    subject: &Subject,
) -> Result<MessageResponse, ApiError> {
    state
        .token_service
        .invalidate_all_for_subject(subject.id())
        .await?;

    Ok(MessageResponse::new("Logged out from all devices"))
}
