//! Subject validation utilities

use thiserror::Error;

/// Errors that can occur during subject validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubjectValidationError {
    #[error("Subject ID cannot be empty")]
    EmptyId,

    #[error("Subject ID cannot exceed {max} characters")]
    IdTooLong { max: usize },

    #[error("Subject ID may only contain letters, digits, and hyphens")]
    InvalidIdCharacters,

    #[error("Mobile number must be {min}-{max} digits")]
    InvalidMobileNumber { min: usize, max: usize },

    #[error("Username must be {min}-{max} characters")]
    InvalidUsernameLength { min: usize, max: usize },

    #[error("Username may only contain lowercase letters, digits, underscores, and hyphens")]
    InvalidUsernameCharacters,

    #[error("Password must be at least {min} characters long")]
    PasswordTooShort { min: usize },
}

const MAX_ID_LENGTH: usize = 64;
const MOBILE_MIN_DIGITS: usize = 10;
const MOBILE_MAX_DIGITS: usize = 15;
const USERNAME_MIN_LENGTH: usize = 3;
const USERNAME_MAX_LENGTH: usize = 50;
const USER_PASSWORD_MIN_LENGTH: usize = 6;
const ADMIN_PASSWORD_MIN_LENGTH: usize = 8;

/// Validate a subject ID: non-empty, bounded, alphanumeric + hyphens
pub fn validate_subject_id(id: &str) -> Result<(), SubjectValidationError> {
    if id.is_empty() {
        return Err(SubjectValidationError::EmptyId);
    }

    if id.len() > MAX_ID_LENGTH {
        return Err(SubjectValidationError::IdTooLong { max: MAX_ID_LENGTH });
    }

    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(SubjectValidationError::InvalidIdCharacters);
    }

    Ok(())
}

/// Validate a user's mobile number login key
pub fn validate_mobile_number(mobile: &str) -> Result<(), SubjectValidationError> {
    let digits = mobile.len();

    if !(MOBILE_MIN_DIGITS..=MOBILE_MAX_DIGITS).contains(&digits)
        || !mobile.chars().all(|c| c.is_ascii_digit())
    {
        return Err(SubjectValidationError::InvalidMobileNumber {
            min: MOBILE_MIN_DIGITS,
            max: MOBILE_MAX_DIGITS,
        });
    }

    Ok(())
}

/// Validate an admin's username login key
pub fn validate_username(username: &str) -> Result<(), SubjectValidationError> {
    if !(USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&username.len()) {
        return Err(SubjectValidationError::InvalidUsernameLength {
            min: USERNAME_MIN_LENGTH,
            max: USERNAME_MAX_LENGTH,
        });
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(SubjectValidationError::InvalidUsernameCharacters);
    }

    Ok(())
}

/// Validate a user password
pub fn validate_user_password(password: &str) -> Result<(), SubjectValidationError> {
    if password.len() < USER_PASSWORD_MIN_LENGTH {
        return Err(SubjectValidationError::PasswordTooShort {
            min: USER_PASSWORD_MIN_LENGTH,
        });
    }
    Ok(())
}

/// Validate an admin password; admins get a stricter minimum
pub fn validate_admin_password(password: &str) -> Result<(), SubjectValidationError> {
    if password.len() < ADMIN_PASSWORD_MIN_LENGTH {
        return Err(SubjectValidationError::PasswordTooShort {
            min: ADMIN_PASSWORD_MIN_LENGTH,
        });
    }
    Ok(())
}
