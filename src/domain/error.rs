use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("No token provided")]
    MissingToken,

    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid credentials")]
    CredentialMismatch,

    #[error("Account deactivated")]
    SubjectInactive,

    #[error("Account temporarily locked")]
    SubjectLocked,

    #[error("Password changed after token was issued")]
    PasswordStale,

    #[error("Insufficient permission: {message}")]
    InsufficientPermission { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid ID format: {message}")]
    InvalidId { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl DomainError {
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    pub fn insufficient_permission(message: impl Into<String>) -> Self {
        Self::InsufficientPermission {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::InvalidId {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_token_error() {
        let error = DomainError::invalid_token("signature mismatch");
        assert_eq!(error.to_string(), "Invalid token: signature mismatch");
    }

    #[test]
    fn test_expired_token_error() {
        let error = DomainError::ExpiredToken;
        assert_eq!(error.to_string(), "Token has expired");
    }

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("Subject 'abc' not found");
        assert_eq!(error.to_string(), "Not found: Subject 'abc' not found");
    }

    #[test]
    fn test_validation_error() {
        let error = DomainError::validation("Invalid input");
        assert_eq!(error.to_string(), "Validation error: Invalid input");
    }
}
