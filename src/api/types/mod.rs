//! API wire types: the JSON envelope, error shape, and safe projections

pub mod error;
pub mod json;
pub mod subject;

pub use error::{ApiError, ApiErrorResponse};
pub use json::Json;
pub use subject::SubjectResponse;
