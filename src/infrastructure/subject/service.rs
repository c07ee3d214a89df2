//! Subject service: registration, credential checks, and lockout bookkeeping

use std::fmt::Debug;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::subject::{
    validate_admin_password, validate_mobile_number, validate_user_password, validate_username,
    Permission, Role, Subject, SubjectId, SubjectKind, SubjectRepository,
};
use crate::domain::DomainError;

use crate::infrastructure::auth::PasswordHasher;

/// Request for registering a new user
#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    pub mobile_number: String,
    pub name: Option<String>,
    pub password: String,
}

/// Request for creating a new admin
#[derive(Debug, Clone)]
pub struct CreateAdminRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub permissions: Vec<Permission>,
}

/// Subject service for authentication and account management.
///
/// One service covers both kinds; operations that differ between users and
/// admins (validation, login key) branch on `SubjectKind`.
#[derive(Debug)]
pub struct SubjectService {
    repository: Arc<dyn SubjectRepository>,
    hasher: Arc<dyn PasswordHasher>,
}

impl SubjectService {
    pub fn new(repository: Arc<dyn SubjectRepository>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { repository, hasher }
    }

    /// Register a new user subject
    pub async fn register_user(
        &self,
        request: RegisterUserRequest,
    ) -> Result<Subject, DomainError> {
        validate_mobile_number(&request.mobile_number)
            .map_err(|e| DomainError::validation(e.to_string()))?;
        validate_user_password(&request.password)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        if self
            .repository
            .identity_exists(SubjectKind::User, &request.mobile_number)
            .await?
        {
            return Err(DomainError::conflict(
                "User with this mobile number already exists",
            ));
        }

        let password_hash = self.hasher.hash(&request.password)?;

        let mut subject =
            Subject::new_user(SubjectId::generate(), &request.mobile_number, password_hash);
        if let Some(name) = request.name {
            subject = subject.with_name(name);
        }

        self.repository.create(subject).await
    }

    /// Create a new admin subject
    pub async fn create_admin(
        &self,
        request: CreateAdminRequest,
    ) -> Result<Subject, DomainError> {
        if request.role.kind() != SubjectKind::Admin {
            return Err(DomainError::validation(
                "Admin role must be 'admin' or 'super_admin'",
            ));
        }

        validate_username(&request.username)
            .map_err(|e| DomainError::validation(e.to_string()))?;
        validate_admin_password(&request.password)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        if self
            .repository
            .identity_exists(SubjectKind::Admin, &request.username)
            .await?
        {
            return Err(DomainError::conflict("Username already exists"));
        }

        let password_hash = self.hasher.hash(&request.password)?;

        let subject = Subject::new_admin(
            SubjectId::generate(),
            &request.username,
            password_hash,
            request.role,
            request.permissions,
        );

        self.repository.create(subject).await
    }

    /// Authenticate a subject by login key and password.
    ///
    /// Lockout is checked before the password, so a correct password on a
    /// locked account still fails with `SubjectLocked`. A wrong password
    /// registers an attempt through the store-level atomic increment.
    pub async fn authenticate(
        &self,
        kind: SubjectKind,
        identity: &str,
        password: &str,
    ) -> Result<Subject, DomainError> {
        let subject = self
            .repository
            .get_by_identity(kind, identity)
            .await?
            // Unknown identity and wrong password are indistinguishable
            .ok_or(DomainError::CredentialMismatch)?;

        if subject.is_locked() {
            warn!(subject_id = %subject.id(), "Login attempt on locked account");
            return Err(DomainError::SubjectLocked);
        }

        if !subject.is_active() {
            return Err(DomainError::SubjectInactive);
        }

        if !self.hasher.verify(password, subject.password_hash()) {
            let updated = self.repository.increment_login_attempts(subject.id()).await?;
            debug!(
                subject_id = %subject.id(),
                attempts = updated.login_attempts(),
                locked = updated.is_locked(),
                "Failed login attempt"
            );
            return Err(DomainError::CredentialMismatch);
        }

        if subject.login_attempts() > 0 {
            self.repository.reset_login_attempts(subject.id()).await?;
        }
        self.repository.record_login(subject.id()).await?;

        // Re-fetch so the caller sees the post-login record
        self.repository
            .get(subject.id())
            .await?
            .ok_or_else(|| DomainError::internal("Subject vanished during login"))
    }

    /// Change a subject's password. The current password must verify; the
    /// new hash gets a fresh salt and the change is stamped so outstanding
    /// tokens read as stale. The caller is responsible for revoking the
    /// subject's ledger records.
    pub async fn change_password(
        &self,
        id: &SubjectId,
        current_password: &str,
        new_password: &str,
    ) -> Result<Subject, DomainError> {
        let mut subject = self
            .repository
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Subject '{}' not found", id)))?;

        if !self.hasher.verify(current_password, subject.password_hash()) {
            return Err(DomainError::CredentialMismatch);
        }

        match subject.kind() {
            SubjectKind::User => validate_user_password(new_password),
            SubjectKind::Admin => validate_admin_password(new_password),
        }
        .map_err(|e| DomainError::validation(e.to_string()))?;

        let new_hash = self.hasher.hash(new_password)?;
        subject.set_password_hash(new_hash);

        self.repository.update(&subject).await
    }

    /// Get a subject by ID
    pub async fn get(&self, id: &SubjectId) -> Result<Option<Subject>, DomainError> {
        self.repository.get(id).await
    }

    /// Get a subject by its login key
    pub async fn get_by_identity(
        &self,
        kind: SubjectKind,
        identity: &str,
    ) -> Result<Option<Subject>, DomainError> {
        self.repository.get_by_identity(kind, identity).await
    }

    /// Count subjects, optionally by kind
    pub async fn count(&self, kind: Option<SubjectKind>) -> Result<usize, DomainError> {
        self.repository.count(kind).await
    }

    /// Deactivate a subject. The caller revokes its ledger records.
    pub async fn deactivate(&self, id: &SubjectId) -> Result<Subject, DomainError> {
        let mut subject = self
            .repository
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Subject '{}' not found", id)))?;

        subject.deactivate();
        self.repository.update(&subject).await
    }

    /// Reactivate a subject
    pub async fn activate(&self, id: &SubjectId) -> Result<Subject, DomainError> {
        let mut subject = self
            .repository
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Subject '{}' not found", id)))?;

        subject.activate();
        self.repository.update(&subject).await
    }

    /// Delete a subject. The caller revokes its ledger records.
    pub async fn delete(&self, id: &SubjectId) -> Result<bool, DomainError> {
        self.repository.delete(id).await
    }
}
