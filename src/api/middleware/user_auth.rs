//! Request guard for user routes

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::subject::{Subject, SubjectId, SubjectKind};
use crate::domain::DomainError;

/// Extractor that requires a valid user access token.
///
/// On success the resolved subject is attached for the handler.
#[derive(Debug, Clone)]
pub struct RequireUser(pub Subject);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let subject = authorize(&parts.headers, state, SubjectKind::User).await?;
        Ok(RequireUser(subject))
    }
}

/// Extract the bearer token from the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid Authorization header encoding"))?;

        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(token.trim().to_string());
        }
    }

    Err(DomainError::MissingToken.into())
}

/// The full gate: token extraction, cryptographic verification, and the
/// live checks against the credential store.
///
/// The live checks close revocation windows a stateless token cannot see:
/// a deleted, deactivated, or locked subject, and a password change newer
/// than the token's issue time.
pub(super) async fn authorize(
    headers: &HeaderMap,
    state: &AppState,
    kind: SubjectKind,
) -> Result<Subject, ApiError> {
    let token = extract_bearer_token(headers)?;

    let claims = state
        .token_service
        .verify_access_token(&token, kind)
        .map_err(|e| {
            debug!(kind = %kind, error = %e, "Access token rejected");
            ApiError::unauthorized("Invalid or expired token.")
        })?;

    let subject_id = SubjectId::new(claims.subject_id())
        .map_err(|_| ApiError::unauthorized("Invalid or expired token."))?;

    let subject = state
        .subject_service
        .get(&subject_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Subject no longer exists."))?;

    if !subject.is_active() {
        return Err(DomainError::SubjectInactive.into());
    }

    if subject.changed_password_after(claims.iat) {
        return Err(DomainError::PasswordStale.into());
    }

    if subject.is_locked() {
        return Err(DomainError::SubjectLocked.into());
    }

    Ok(subject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            "Bearer eyJhbGciOiJIUzI1NiJ9.test".parse().unwrap(),
        );

        let token = extract_bearer_token(&headers).unwrap();
        assert_eq!(token, "eyJhbGciOiJIUzI1NiJ9.test");
    }

    #[test]
    fn test_missing_header() {
        let headers = HeaderMap::new();

        let err = extract_bearer_token(&headers).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());

        let err = extract_bearer_token(&headers).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_token_is_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            "Bearer   padded-token   ".parse().unwrap(),
        );

        let token = extract_bearer_token(&headers).unwrap();
        assert_eq!(token, "padded-token");
    }
}
