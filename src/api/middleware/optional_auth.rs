//! Optional authentication for routes that serve both anonymous and
//! authenticated callers

use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

use crate::api::state::AppState;
use crate::domain::subject::{Subject, SubjectKind};

use super::user_auth::authorize;

/// Extractor that runs the full user gate but never rejects: any failure
/// (missing header, bad token, inactive or locked subject) yields `None`
/// and the request proceeds anonymously.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<Subject>);

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let subject = authorize(&parts.headers, state, SubjectKind::User)
            .await
            .ok();
        Ok(OptionalUser(subject))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::{routing::get, Router};
    use tower::ServiceExt;

    use super::*;
    use crate::domain::token::DeviceContext;
    use crate::infrastructure::auth::{Argon2Hasher, TokenConfig, TokenService};
    use crate::infrastructure::subject::{
        InMemorySubjectRepository, RegisterUserRequest, SubjectService,
    };
    use crate::infrastructure::token::InMemoryTokenLedger;

    async fn greet(OptionalUser(subject): OptionalUser) -> String {
        match subject {
            Some(subject) => format!("hello {}", subject.identity()),
            None => "hello guest".to_string(),
        }
    }

    fn test_state() -> AppState {
        AppState::new(
            Arc::new(SubjectService::new(
                Arc::new(InMemorySubjectRepository::new()),
                Arc::new(Argon2Hasher::new()),
            )),
            Arc::new(TokenService::new(
                Arc::new(InMemoryTokenLedger::new()),
                TokenConfig::default(),
            )),
        )
    }

    async fn body_string(app: Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_optional_auth_never_rejects() {
        let state = test_state();

        let subject = state
            .subject_service
            .register_user(RegisterUserRequest {
                mobile_number: "9998887770".to_string(),
                name: None,
                password: "secret1".to_string(),
            })
            .await
            .unwrap();
        let pair = state
            .token_service
            .issue_pair(subject.id(), subject.role(), DeviceContext::default())
            .await
            .unwrap();

        let app = Router::new()
            .route("/greet", get(greet))
            .with_state(state.clone());

        // Anonymous caller gets the guest path
        let (status, body) = body_string(
            app.clone(),
            Request::builder()
                .uri("/greet")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "hello guest");

        // Valid token attaches the identity
        let (status, body) = body_string(
            app.clone(),
            Request::builder()
                .uri("/greet")
                .header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", pair.access_token),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "hello 9998887770");

        // A garbage token degrades to anonymous instead of rejecting
        let (status, body) = body_string(
            app,
            Request::builder()
                .uri("/greet")
                .header(header::AUTHORIZATION, "Bearer garbage")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "hello guest");
    }
}
