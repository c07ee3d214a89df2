//! Subject domain: the authenticatable identity behind users and admins

mod entity;
mod repository;
mod validation;

pub use entity::{
    Permission, Role, Subject, SubjectId, SubjectKind, LOCK_DURATION_SECS, MAX_LOGIN_ATTEMPTS,
};
pub use repository::SubjectRepository;
pub use validation::{
    validate_admin_password, validate_mobile_number, validate_subject_id, validate_user_password,
    validate_username, SubjectValidationError,
};
