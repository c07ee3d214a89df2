//! Subject repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{Subject, SubjectId, SubjectKind};
use crate::domain::DomainError;

/// Repository trait for subject storage.
///
/// The attempt-counter operations must be atomic at the store layer:
/// concurrent failed logins race on the same record, and a lost update
/// would undercount toward the lockout threshold.
#[async_trait]
pub trait SubjectRepository: Send + Sync + Debug {
    /// Get a subject by ID
    async fn get(&self, id: &SubjectId) -> Result<Option<Subject>, DomainError>;

    /// Get a subject by its login key (mobile number or username),
    /// scoped to a kind
    async fn get_by_identity(
        &self,
        kind: SubjectKind,
        identity: &str,
    ) -> Result<Option<Subject>, DomainError>;

    /// Create a new subject
    async fn create(&self, subject: Subject) -> Result<Subject, DomainError>;

    /// Update an existing subject
    async fn update(&self, subject: &Subject) -> Result<Subject, DomainError>;

    /// Delete a subject
    async fn delete(&self, id: &SubjectId) -> Result<bool, DomainError>;

    /// List subjects, optionally filtered by kind
    async fn list(&self, kind: Option<SubjectKind>) -> Result<Vec<Subject>, DomainError>;

    /// Count subjects, optionally filtered by kind
    async fn count(&self, kind: Option<SubjectKind>) -> Result<usize, DomainError>;

    /// Atomically register a failed login attempt and apply the lockout
    /// policy. Returns the post-update subject.
    async fn increment_login_attempts(&self, id: &SubjectId) -> Result<Subject, DomainError>;

    /// Atomically clear the attempt counter and any lock
    async fn reset_login_attempts(&self, id: &SubjectId) -> Result<(), DomainError>;

    /// Record a login for a subject
    async fn record_login(&self, id: &SubjectId) -> Result<(), DomainError>;

    /// Check if a login key is taken for the given kind
    async fn identity_exists(
        &self,
        kind: SubjectKind,
        identity: &str,
    ) -> Result<bool, DomainError> {
        Ok(self.get_by_identity(kind, identity).await?.is_some())
    }
}
