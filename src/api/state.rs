//! Application state shared across handlers and guards

use std::sync::Arc;

use crate::infrastructure::auth::TokenService;
use crate::infrastructure::subject::SubjectService;

/// Shared services every request can reach
#[derive(Clone)]
pub struct AppState {
    pub subject_service: Arc<SubjectService>,
    pub token_service: Arc<TokenService>,
}

impl AppState {
    pub fn new(subject_service: Arc<SubjectService>, token_service: Arc<TokenService>) -> Self {
        Self {
            subject_service,
            token_service,
        }
    }
}
