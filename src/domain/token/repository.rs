//! Token ledger trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::RefreshTokenRecord;
use crate::domain::subject::SubjectId;
use crate::domain::DomainError;

/// Persisted set of refresh token records and their validity.
///
/// Expiry is enforced by query-time filtering: every lookup and count
/// excludes records past `expires_at`. `invalidate_if_valid` is the
/// rotation guard and must be atomic - two requests racing to redeem the
/// same token get exactly one winner.
#[async_trait]
pub trait TokenLedger: Send + Sync + Debug {
    /// Insert a new record
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), DomainError>;

    /// Find the record for a token iff it is still usable
    /// (valid and unexpired)
    async fn find_valid(&self, token: &str) -> Result<Option<RefreshTokenRecord>, DomainError>;

    /// Mark one record invalid. Idempotent: unknown or already-invalid
    /// tokens are not an error.
    async fn invalidate(&self, token: &str) -> Result<(), DomainError>;

    /// Atomically mark a record invalid iff it is currently usable.
    /// Returns whether this call was the one that flipped it.
    async fn invalidate_if_valid(&self, token: &str) -> Result<bool, DomainError>;

    /// Mark every record owned by the subject invalid in one update.
    /// Returns the number of records flipped.
    async fn invalidate_all_for_subject(&self, subject_id: &SubjectId)
        -> Result<u64, DomainError>;

    /// Count usable records for a subject (active sessions)
    async fn count_valid_for_subject(&self, subject_id: &SubjectId) -> Result<u64, DomainError>;

    /// Count usable records across all subjects
    async fn count_valid(&self) -> Result<u64, DomainError>;

    /// Delete records past their expiry. Returns the number removed.
    async fn delete_expired(&self) -> Result<u64, DomainError>;
}
