//! Storage bootstrap for the PostgreSQL backend

use sqlx::PgPool;

use crate::domain::DomainError;

/// Ensure the tables and indexes the service needs exist.
///
/// Idempotent; runs at startup before any traffic is served. The partial
/// index on usable ledger rows backs the hot `find_valid` /
/// `invalidate_if_valid` path.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), DomainError> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS subjects (
            id TEXT PRIMARY KEY,
            identity TEXT NOT NULL,
            name TEXT,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            login_attempts INTEGER NOT NULL DEFAULT 0,
            lock_until TIMESTAMPTZ,
            password_changed_at TIMESTAMPTZ,
            permissions TEXT[] NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            last_login_at TIMESTAMPTZ
        )
        "#,
        // One login key per kind: users and admins live in separate namespaces
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS subjects_user_identity
            ON subjects (identity) WHERE role = 'user'
        "#,
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS subjects_admin_identity
            ON subjects (identity) WHERE role IN ('admin', 'super_admin')
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS refresh_tokens (
            id TEXT PRIMARY KEY,
            subject_id TEXT NOT NULL,
            refresh_token TEXT NOT NULL UNIQUE,
            user_agent TEXT,
            ip_address TEXT,
            is_valid BOOLEAN NOT NULL DEFAULT TRUE,
            expires_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS refresh_tokens_subject
            ON refresh_tokens (subject_id) WHERE is_valid
        "#,
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to ensure schema: {}", e)))?;
    }

    Ok(())
}
