//! Refresh token ledger entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::subject::SubjectId;

/// Advisory metadata about the device a token pair was issued to.
///
/// Recorded for auditing only; never enforced at verification time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceContext {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl DeviceContext {
    pub fn new(
        user_agent: impl Into<Option<String>>,
        ip_address: impl Into<Option<String>>,
    ) -> Self {
        Self {
            user_agent: user_agent.into(),
            ip_address: ip_address.into(),
        }
    }
}

/// A persisted refresh token record.
///
/// Usable iff it exists, `is_valid`, and `now < expires_at`. Expired records
/// are excluded from every validity query and reaped by an explicit sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    id: String,
    subject_id: SubjectId,
    refresh_token: String,
    device: DeviceContext,
    is_valid: bool,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn new(
        subject_id: SubjectId,
        refresh_token: impl Into<String>,
        device: DeviceContext,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            subject_id,
            refresh_token: refresh_token.into(),
            device,
            is_valid: true,
            expires_at,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn subject_id(&self) -> &SubjectId {
        &self.subject_id
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn device(&self) -> &DeviceContext {
        &self.device
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Usable: present, still marked valid, and not yet expired
    pub fn is_usable(&self) -> bool {
        self.is_valid && !self.is_expired()
    }

    /// Mark the record invalid
    pub fn invalidate(&mut self) {
        self.is_valid = false;
    }

    /// Reconstruct a record from stored fields. Intended for repository
    /// implementations only.
    pub fn from_parts(
        id: String,
        subject_id: SubjectId,
        refresh_token: String,
        device: DeviceContext,
        is_valid: bool,
        expires_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            subject_id,
            refresh_token,
            device,
            is_valid,
            expires_at,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(expires_in_secs: i64) -> RefreshTokenRecord {
        RefreshTokenRecord::new(
            SubjectId::generate(),
            "token-string",
            DeviceContext::default(),
            Utc::now() + Duration::seconds(expires_in_secs),
        )
    }

    #[test]
    fn test_fresh_record_is_usable() {
        let rec = record(60);
        assert!(rec.is_valid());
        assert!(!rec.is_expired());
        assert!(rec.is_usable());
    }

    #[test]
    fn test_invalidated_record_is_not_usable() {
        let mut rec = record(60);
        rec.invalidate();
        assert!(!rec.is_valid());
        assert!(!rec.is_usable());
    }

    #[test]
    fn test_expired_record_is_not_usable() {
        let rec = record(-1);
        assert!(rec.is_valid());
        assert!(rec.is_expired());
        assert!(!rec.is_usable());
    }
}
