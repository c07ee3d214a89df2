//! In-memory subject repository

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::subject::{Subject, SubjectId, SubjectKind, SubjectRepository};
use crate::domain::DomainError;

/// In-memory implementation of `SubjectRepository`.
///
/// The attempt-counter operations run under the write lock, which gives
/// them the same no-lost-updates guarantee the SQL implementation gets
/// from single-statement updates.
#[derive(Debug, Default)]
pub struct InMemorySubjectRepository {
    subjects: Arc<RwLock<HashMap<String, Subject>>>,
}

impl InMemorySubjectRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubjectRepository for InMemorySubjectRepository {
    async fn get(&self, id: &SubjectId) -> Result<Option<Subject>, DomainError> {
        let subjects = self.subjects.read().await;
        Ok(subjects.get(id.as_str()).cloned())
    }

    async fn get_by_identity(
        &self,
        kind: SubjectKind,
        identity: &str,
    ) -> Result<Option<Subject>, DomainError> {
        let subjects = self.subjects.read().await;
        Ok(subjects
            .values()
            .find(|s| s.kind() == kind && s.identity() == identity)
            .cloned())
    }

    async fn create(&self, subject: Subject) -> Result<Subject, DomainError> {
        let mut subjects = self.subjects.write().await;
        let id = subject.id().as_str().to_string();

        if subjects.contains_key(&id) {
            return Err(DomainError::conflict(format!(
                "Subject with ID '{}' already exists",
                id
            )));
        }

        let identity_taken = subjects
            .values()
            .any(|s| s.kind() == subject.kind() && s.identity() == subject.identity());

        if identity_taken {
            return Err(DomainError::conflict(format!(
                "Identity '{}' already exists",
                subject.identity()
            )));
        }

        subjects.insert(id, subject.clone());
        Ok(subject)
    }

    async fn update(&self, subject: &Subject) -> Result<Subject, DomainError> {
        let mut subjects = self.subjects.write().await;
        let id = subject.id().as_str().to_string();

        if !subjects.contains_key(&id) {
            return Err(DomainError::not_found(format!(
                "Subject '{}' not found",
                id
            )));
        }

        subjects.insert(id, subject.clone());
        Ok(subject.clone())
    }

    async fn delete(&self, id: &SubjectId) -> Result<bool, DomainError> {
        let mut subjects = self.subjects.write().await;
        Ok(subjects.remove(id.as_str()).is_some())
    }

    async fn list(&self, kind: Option<SubjectKind>) -> Result<Vec<Subject>, DomainError> {
        let subjects = self.subjects.read().await;
        Ok(subjects
            .values()
            .filter(|s| kind.is_none_or(|k| s.kind() == k))
            .cloned()
            .collect())
    }

    async fn count(&self, kind: Option<SubjectKind>) -> Result<usize, DomainError> {
        let subjects = self.subjects.read().await;
        Ok(subjects
            .values()
            .filter(|s| kind.is_none_or(|k| s.kind() == k))
            .count())
    }

    async fn increment_login_attempts(&self, id: &SubjectId) -> Result<Subject, DomainError> {
        let mut subjects = self.subjects.write().await;

        let subject = subjects
            .get_mut(id.as_str())
            .ok_or_else(|| DomainError::not_found(format!("Subject '{}' not found", id)))?;

        subject.note_failed_login();
        Ok(subject.clone())
    }

    async fn reset_login_attempts(&self, id: &SubjectId) -> Result<(), DomainError> {
        let mut subjects = self.subjects.write().await;

        let subject = subjects
            .get_mut(id.as_str())
            .ok_or_else(|| DomainError::not_found(format!("Subject '{}' not found", id)))?;

        subject.clear_failed_logins();
        Ok(())
    }

    async fn record_login(&self, id: &SubjectId) -> Result<(), DomainError> {
        let mut subjects = self.subjects.write().await;

        let subject = subjects
            .get_mut(id.as_str())
            .ok_or_else(|| DomainError::not_found(format!("Subject '{}' not found", id)))?;

        subject.record_login();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subject::{Role, MAX_LOGIN_ATTEMPTS};

    fn user(mobile: &str) -> Subject {
        Subject::new_user(SubjectId::generate(), mobile, "hash")
    }

    fn admin(username: &str) -> Subject {
        Subject::new_admin(SubjectId::generate(), username, "hash", Role::Admin, vec![])
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = InMemorySubjectRepository::new();
        let subject = user("9998887770");

        repo.create(subject.clone()).await.unwrap();

        let found = repo.get(subject.id()).await.unwrap().unwrap();
        assert_eq!(found.identity(), "9998887770");
    }

    #[tokio::test]
    async fn test_get_by_identity_is_kind_scoped() {
        let repo = InMemorySubjectRepository::new();
        repo.create(user("9998887770")).await.unwrap();
        repo.create(admin("storeadmin")).await.unwrap();

        let found = repo
            .get_by_identity(SubjectKind::User, "9998887770")
            .await
            .unwrap();
        assert!(found.is_some());

        // A user identity does not resolve as an admin
        let missing = repo
            .get_by_identity(SubjectKind::Admin, "9998887770")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_identity_uniqueness_per_kind() {
        let repo = InMemorySubjectRepository::new();
        repo.create(user("9998887770")).await.unwrap();

        let result = repo.create(user("9998887770")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_update_missing_subject() {
        let repo = InMemorySubjectRepository::new();
        let subject = user("9998887770");

        let result = repo.update(&subject).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = InMemorySubjectRepository::new();
        let subject = user("9998887770");
        repo.create(subject.clone()).await.unwrap();

        assert!(repo.delete(subject.id()).await.unwrap());
        assert!(!repo.delete(subject.id()).await.unwrap());
        assert!(repo.get(subject.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_and_count_by_kind() {
        let repo = InMemorySubjectRepository::new();
        repo.create(user("9998887770")).await.unwrap();
        repo.create(user("9998887771")).await.unwrap();
        repo.create(admin("storeadmin")).await.unwrap();

        assert_eq!(repo.count(None).await.unwrap(), 3);
        assert_eq!(repo.count(Some(SubjectKind::User)).await.unwrap(), 2);
        assert_eq!(repo.count(Some(SubjectKind::Admin)).await.unwrap(), 1);

        let admins = repo.list(Some(SubjectKind::Admin)).await.unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].identity(), "storeadmin");
    }

    #[tokio::test]
    async fn test_increment_to_lockout() {
        let repo = InMemorySubjectRepository::new();
        let subject = user("9998887770");
        repo.create(subject.clone()).await.unwrap();

        for n in 1..MAX_LOGIN_ATTEMPTS {
            let updated = repo.increment_login_attempts(subject.id()).await.unwrap();
            assert_eq!(updated.login_attempts(), n);
            assert!(!updated.is_locked());
        }

        let locked = repo.increment_login_attempts(subject.id()).await.unwrap();
        assert_eq!(locked.login_attempts(), MAX_LOGIN_ATTEMPTS);
        assert!(locked.is_locked());
    }

    #[tokio::test]
    async fn test_reset_login_attempts() {
        let repo = InMemorySubjectRepository::new();
        let subject = user("9998887770");
        repo.create(subject.clone()).await.unwrap();

        for _ in 0..MAX_LOGIN_ATTEMPTS {
            repo.increment_login_attempts(subject.id()).await.unwrap();
        }

        repo.reset_login_attempts(subject.id()).await.unwrap();

        let reset = repo.get(subject.id()).await.unwrap().unwrap();
        assert_eq!(reset.login_attempts(), 0);
        assert!(!reset.is_locked());
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let repo = Arc::new(InMemorySubjectRepository::new());
        let subject = user("9998887770");
        repo.create(subject.clone()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let repo = repo.clone();
            let id = subject.id().clone();
            handles.push(tokio::spawn(async move {
                repo.increment_login_attempts(&id).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let updated = repo.get(subject.id()).await.unwrap().unwrap();
        assert_eq!(updated.login_attempts(), 4);
    }

    #[tokio::test]
    async fn test_record_login() {
        let repo = InMemorySubjectRepository::new();
        let subject = user("9998887770");
        repo.create(subject.clone()).await.unwrap();

        repo.record_login(subject.id()).await.unwrap();

        let updated = repo.get(subject.id()).await.unwrap().unwrap();
        assert!(updated.last_login_at().is_some());
    }
}
