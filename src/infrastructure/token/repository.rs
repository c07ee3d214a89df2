//! In-memory token ledger

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::subject::SubjectId;
use crate::domain::token::{RefreshTokenRecord, TokenLedger};
use crate::domain::DomainError;

/// In-memory ledger keyed by the refresh token string.
///
/// The write lock makes `invalidate_if_valid` a test-and-set, which is the
/// atomicity rotation needs.
#[derive(Debug, Default)]
pub struct InMemoryTokenLedger {
    records: Arc<RwLock<HashMap<String, RefreshTokenRecord>>>,
}

impl InMemoryTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenLedger for InMemoryTokenLedger {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), DomainError> {
        let mut records = self.records.write().await;

        if records.contains_key(record.refresh_token()) {
            return Err(DomainError::conflict(
                "Refresh token already present in ledger",
            ));
        }

        records.insert(record.refresh_token().to_string(), record);
        Ok(())
    }

    async fn find_valid(&self, token: &str) -> Result<Option<RefreshTokenRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records.get(token).filter(|r| r.is_usable()).cloned())
    }

    async fn invalidate(&self, token: &str) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(token) {
            record.invalidate();
        }
        Ok(())
    }

    async fn invalidate_if_valid(&self, token: &str) -> Result<bool, DomainError> {
        let mut records = self.records.write().await;

        match records.get_mut(token) {
            Some(record) if record.is_usable() => {
                record.invalidate();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn invalidate_all_for_subject(
        &self,
        subject_id: &SubjectId,
    ) -> Result<u64, DomainError> {
        let mut records = self.records.write().await;
        let mut flipped = 0;

        for record in records.values_mut() {
            if record.subject_id() == subject_id && record.is_valid() {
                record.invalidate();
                flipped += 1;
            }
        }

        Ok(flipped)
    }

    async fn count_valid_for_subject(&self, subject_id: &SubjectId) -> Result<u64, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.subject_id() == subject_id && r.is_usable())
            .count() as u64)
    }

    async fn count_valid(&self) -> Result<u64, DomainError> {
        let records = self.records.read().await;
        Ok(records.values().filter(|r| r.is_usable()).count() as u64)
    }

    async fn delete_expired(&self) -> Result<u64, DomainError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| !r.is_expired());
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::token::DeviceContext;
    use chrono::{Duration, Utc};

    fn record(subject_id: &SubjectId, token: &str, expires_in_secs: i64) -> RefreshTokenRecord {
        RefreshTokenRecord::new(
            subject_id.clone(),
            token,
            DeviceContext::default(),
            Utc::now() + Duration::seconds(expires_in_secs),
        )
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let ledger = InMemoryTokenLedger::new();
        let id = SubjectId::generate();

        ledger.insert(record(&id, "tok-1", 60)).await.unwrap();

        let found = ledger.find_valid("tok-1").await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().subject_id(), &id);

        assert!(ledger.find_valid("tok-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let ledger = InMemoryTokenLedger::new();
        let id = SubjectId::generate();

        ledger.insert(record(&id, "tok-1", 60)).await.unwrap();
        let result = ledger.insert(record(&id, "tok-1", 60)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_expired_record_excluded_from_queries() {
        let ledger = InMemoryTokenLedger::new();
        let id = SubjectId::generate();

        ledger.insert(record(&id, "expired", -1)).await.unwrap();

        assert!(ledger.find_valid("expired").await.unwrap().is_none());
        assert_eq!(ledger.count_valid().await.unwrap(), 0);
        assert_eq!(ledger.count_valid_for_subject(&id).await.unwrap(), 0);

        // And an expired record cannot be claimed for rotation
        assert!(!ledger.invalidate_if_valid("expired").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalidate_if_valid_has_one_winner() {
        let ledger = InMemoryTokenLedger::new();
        let id = SubjectId::generate();

        ledger.insert(record(&id, "tok-1", 60)).await.unwrap();

        assert!(ledger.invalidate_if_valid("tok-1").await.unwrap());
        assert!(!ledger.invalidate_if_valid("tok-1").await.unwrap());
        assert!(!ledger.invalidate_if_valid("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let ledger = InMemoryTokenLedger::new();
        let id = SubjectId::generate();

        ledger.insert(record(&id, "tok-1", 60)).await.unwrap();

        ledger.invalidate("tok-1").await.unwrap();
        ledger.invalidate("tok-1").await.unwrap();
        ledger.invalidate("missing").await.unwrap();

        assert!(ledger.find_valid("tok-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_all_for_subject() {
        let ledger = InMemoryTokenLedger::new();
        let id = SubjectId::generate();
        let other = SubjectId::generate();

        ledger.insert(record(&id, "a", 60)).await.unwrap();
        ledger.insert(record(&id, "b", 60)).await.unwrap();
        ledger.insert(record(&other, "c", 60)).await.unwrap();

        let flipped = ledger.invalidate_all_for_subject(&id).await.unwrap();
        assert_eq!(flipped, 2);

        // Already-invalid records are not counted twice
        let again = ledger.invalidate_all_for_subject(&id).await.unwrap();
        assert_eq!(again, 0);

        assert!(ledger.find_valid("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let ledger = InMemoryTokenLedger::new();
        let id = SubjectId::generate();

        ledger.insert(record(&id, "live", 60)).await.unwrap();
        ledger.insert(record(&id, "dead-1", -1)).await.unwrap();
        ledger.insert(record(&id, "dead-2", -60)).await.unwrap();

        let removed = ledger.delete_expired().await.unwrap();
        assert_eq!(removed, 2);

        assert!(ledger.find_valid("live").await.unwrap().is_some());
        assert_eq!(ledger.delete_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_rotation_race() {
        let ledger = Arc::new(InMemoryTokenLedger::new());
        let id = SubjectId::generate();

        ledger.insert(record(&id, "contested", 60)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.invalidate_if_valid("contested").await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
    }
}
