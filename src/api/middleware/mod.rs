//! Request guards

pub mod admin_auth;
pub mod optional_auth;
pub mod user_auth;

pub use admin_auth::{ensure_permission, RequireAdmin};
pub use optional_auth::OptionalUser;
pub use user_auth::{extract_bearer_token, RequireUser};

use axum::http::{header, HeaderMap};

use crate::domain::token::DeviceContext;

/// Advisory device metadata for the token ledger, read from request headers
pub fn device_context(headers: &HeaderMap) -> DeviceContext {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    // First hop of X-Forwarded-For when present; never enforced, only logged
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());

    DeviceContext::new(user_agent, ip_address)
}
