//! PostgreSQL subject repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::domain::subject::{
    Permission, Role, Subject, SubjectId, SubjectKind, SubjectRepository, LOCK_DURATION_SECS,
    MAX_LOGIN_ATTEMPTS,
};
use crate::domain::DomainError;

/// PostgreSQL implementation of `SubjectRepository`.
///
/// The lockout bookkeeping runs as single UPDATE statements so concurrent
/// failed logins cannot lose increments.
#[derive(Debug, Clone)]
pub struct PostgresSubjectRepository {
    pool: PgPool,
}

impl PostgresSubjectRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SUBJECT_COLUMNS: &str = "id, identity, name, password_hash, role, is_active, \
     login_attempts, lock_until, password_changed_at, permissions, \
     created_at, updated_at, last_login_at";

/// Roles belonging to a kind, for SQL `role = ANY($n)` filters
fn kind_roles(kind: SubjectKind) -> Vec<String> {
    match kind {
        SubjectKind::User => vec!["user".to_string()],
        SubjectKind::Admin => vec!["admin".to_string(), "super_admin".to_string()],
    }
}

#[async_trait]
impl SubjectRepository for PostgresSubjectRepository {
    async fn get(&self, id: &SubjectId) -> Result<Option<Subject>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = $1"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get subject: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_subject(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_by_identity(
        &self,
        kind: SubjectKind,
        identity: &str,
    ) -> Result<Option<Subject>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE identity = $1 AND role = ANY($2)"
        ))
        .bind(identity)
        .bind(kind_roles(kind))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get subject by identity: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_subject(&row)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, subject: Subject) -> Result<Subject, DomainError> {
        let permissions: Vec<String> = subject
            .permissions()
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();

        sqlx::query(
            r#"
            INSERT INTO subjects
                (id, identity, name, password_hash, role, is_active,
                 login_attempts, lock_until, password_changed_at, permissions,
                 created_at, updated_at, last_login_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(subject.id().as_str())
        .bind(subject.identity())
        .bind(subject.name())
        .bind(subject.password_hash())
        .bind(subject.role().as_str())
        .bind(subject.is_active())
        .bind(subject.login_attempts() as i32)
        .bind(subject.lock_until())
        .bind(subject.password_changed_at())
        .bind(permissions)
        .bind(subject.created_at())
        .bind(subject.updated_at())
        .bind(subject.last_login_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let msg = e.to_string();

            if msg.contains("duplicate key") || msg.contains("unique constraint") {
                DomainError::conflict(format!(
                    "Identity '{}' already exists",
                    subject.identity()
                ))
            } else {
                DomainError::storage(format!("Failed to create subject: {}", e))
            }
        })?;

        Ok(subject)
    }

    async fn update(&self, subject: &Subject) -> Result<Subject, DomainError> {
        let permissions: Vec<String> = subject
            .permissions()
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();

        let result = sqlx::query(
            r#"
            UPDATE subjects
            SET identity = $2, name = $3, password_hash = $4, role = $5,
                is_active = $6, login_attempts = $7, lock_until = $8,
                password_changed_at = $9, permissions = $10, updated_at = $11,
                last_login_at = $12
            WHERE id = $1
            "#,
        )
        .bind(subject.id().as_str())
        .bind(subject.identity())
        .bind(subject.name())
        .bind(subject.password_hash())
        .bind(subject.role().as_str())
        .bind(subject.is_active())
        .bind(subject.login_attempts() as i32)
        .bind(subject.lock_until())
        .bind(subject.password_changed_at())
        .bind(permissions)
        .bind(subject.updated_at())
        .bind(subject.last_login_at())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to update subject: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Subject '{}' not found",
                subject.id().as_str()
            )));
        }

        Ok(subject.clone())
    }

    async fn delete(&self, id: &SubjectId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM subjects WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete subject: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, kind: Option<SubjectKind>) -> Result<Vec<Subject>, DomainError> {
        let rows = match kind {
            Some(kind) => {
                sqlx::query(&format!(
                    "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE role = ANY($1) ORDER BY created_at"
                ))
                .bind(kind_roles(kind))
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {SUBJECT_COLUMNS} FROM subjects ORDER BY created_at"
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| DomainError::storage(format!("Failed to list subjects: {}", e)))?;

        rows.iter().map(row_to_subject).collect()
    }

    async fn count(&self, kind: Option<SubjectKind>) -> Result<usize, DomainError> {
        let row = match kind {
            Some(kind) => {
                sqlx::query("SELECT COUNT(*) AS count FROM subjects WHERE role = ANY($1)")
                    .bind(kind_roles(kind))
                    .fetch_one(&self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT COUNT(*) AS count FROM subjects")
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(|e| DomainError::storage(format!("Failed to count subjects: {}", e)))?;

        let count: i64 = row.get("count");
        Ok(count as usize)
    }

    async fn increment_login_attempts(&self, id: &SubjectId) -> Result<Subject, DomainError> {
        // One statement applies the whole policy: an expired lock resets the
        // counter, otherwise it increments, and crossing the threshold while
        // unlocked sets the lock.
        let row = sqlx::query(&format!(
            r#"
            UPDATE subjects
            SET login_attempts = CASE
                    WHEN lock_until IS NOT NULL AND lock_until < NOW() THEN 1
                    ELSE login_attempts + 1
                END,
                lock_until = CASE
                    WHEN lock_until IS NOT NULL AND lock_until < NOW() THEN NULL
                    WHEN lock_until IS NULL AND login_attempts + 1 >= $2
                        THEN NOW() + make_interval(secs => $3)
                    ELSE lock_until
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SUBJECT_COLUMNS}
            "#
        ))
        .bind(id.as_str())
        .bind(MAX_LOGIN_ATTEMPTS as i32)
        .bind(LOCK_DURATION_SECS as f64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to increment login attempts: {}", e)))?;

        match row {
            Some(row) => row_to_subject(&row),
            None => Err(DomainError::not_found(format!(
                "Subject '{}' not found",
                id
            ))),
        }
    }

    async fn reset_login_attempts(&self, id: &SubjectId) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE subjects SET login_attempts = 0, lock_until = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to reset login attempts: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Subject '{}' not found",
                id
            )));
        }

        Ok(())
    }

    async fn record_login(&self, id: &SubjectId) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE subjects SET last_login_at = NOW() WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to record login: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Subject '{}' not found",
                id
            )));
        }

        Ok(())
    }
}

fn row_to_subject(row: &sqlx::postgres::PgRow) -> Result<Subject, DomainError> {
    let id: String = row.get("id");
    let identity: String = row.get("identity");
    let name: Option<String> = row.get("name");
    let password_hash: String = row.get("password_hash");
    let role: String = row.get("role");
    let is_active: bool = row.get("is_active");
    let login_attempts: i32 = row.get("login_attempts");
    let lock_until: Option<DateTime<Utc>> = row.get("lock_until");
    let password_changed_at: Option<DateTime<Utc>> = row.get("password_changed_at");
    let permissions: Vec<String> = row.get("permissions");
    let created_at: DateTime<Utc> = row.get("created_at");
    let updated_at: DateTime<Utc> = row.get("updated_at");
    let last_login_at: Option<DateTime<Utc>> = row.get("last_login_at");

    let id = SubjectId::new(id)
        .map_err(|e| DomainError::storage(format!("Corrupt subject id in row: {}", e)))?;

    let role = Role::parse(&role)
        .ok_or_else(|| DomainError::storage(format!("Unknown role '{}' in row", role)))?;

    let permissions = permissions
        .iter()
        .filter_map(|p| Permission::parse(p))
        .collect();

    Ok(Subject::from_parts(
        id,
        identity,
        name,
        password_hash,
        role,
        is_active,
        login_attempts.max(0) as u32,
        lock_until,
        password_changed_at,
        permissions,
        created_at,
        updated_at,
        last_login_at,
    ))
}
