//! PostgreSQL token ledger implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::domain::subject::SubjectId;
use crate::domain::token::{DeviceContext, RefreshTokenRecord, TokenLedger};
use crate::domain::DomainError;

/// PostgreSQL implementation of the token ledger.
///
/// `invalidate_if_valid` relies on single-statement UPDATE semantics for the
/// rotation race: of two requests redeeming the same token, exactly one
/// observes `rows_affected == 1`.
#[derive(Debug, Clone)]
pub struct PostgresTokenLedger {
    pool: PgPool,
}

impl PostgresTokenLedger {
    /// Create a new ledger backed by the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenLedger for PostgresTokenLedger {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens
                (id, subject_id, refresh_token, user_agent, ip_address,
                 is_valid, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id())
        .bind(record.subject_id().as_str())
        .bind(record.refresh_token())
        .bind(record.device().user_agent.as_deref())
        .bind(record.device().ip_address.as_deref())
        .bind(record.is_valid())
        .bind(record.expires_at())
        .bind(record.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let msg = e.to_string();

            if msg.contains("duplicate key") || msg.contains("unique constraint") {
                DomainError::conflict("Refresh token already present in ledger")
            } else {
                DomainError::storage(format!("Failed to insert refresh token: {}", e))
            }
        })?;

        Ok(())
    }

    async fn find_valid(&self, token: &str) -> Result<Option<RefreshTokenRecord>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, subject_id, refresh_token, user_agent, ip_address,
                   is_valid, expires_at, created_at
            FROM refresh_tokens
            WHERE refresh_token = $1 AND is_valid = TRUE AND expires_at > NOW()
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to look up refresh token: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn invalidate(&self, token: &str) -> Result<(), DomainError> {
        // Idempotent by design: zero affected rows is fine
        sqlx::query("UPDATE refresh_tokens SET is_valid = FALSE WHERE refresh_token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::storage(format!("Failed to invalidate refresh token: {}", e))
            })?;

        Ok(())
    }

    async fn invalidate_if_valid(&self, token: &str) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_valid = FALSE
            WHERE refresh_token = $1 AND is_valid = TRUE AND expires_at > NOW()
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to claim refresh token: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }

    async fn invalidate_all_for_subject(
        &self,
        subject_id: &SubjectId,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET is_valid = FALSE WHERE subject_id = $1 AND is_valid = TRUE",
        )
        .bind(subject_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::storage(format!("Failed to invalidate subject tokens: {}", e))
        })?;

        Ok(result.rows_affected())
    }

    async fn count_valid_for_subject(&self, subject_id: &SubjectId) -> Result<u64, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS count
            FROM refresh_tokens
            WHERE subject_id = $1 AND is_valid = TRUE AND expires_at > NOW()
            "#,
        )
        .bind(subject_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to count subject tokens: {}", e)))?;

        let count: i64 = row.get("count");
        Ok(count as u64)
    }

    async fn count_valid(&self) -> Result<u64, DomainError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM refresh_tokens WHERE is_valid = TRUE AND expires_at > NOW()",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to count tokens: {}", e)))?;

        let count: i64 = row.get("count");
        Ok(count as u64)
    }

    async fn delete_expired(&self) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to sweep expired tokens: {}", e)))?;

        Ok(result.rows_affected())
    }
}

fn row_to_record(row: &sqlx::postgres::PgRow) -> Result<RefreshTokenRecord, DomainError> {
    let id: String = row.get("id");
    let subject_id: String = row.get("subject_id");
    let refresh_token: String = row.get("refresh_token");
    let user_agent: Option<String> = row.get("user_agent");
    let ip_address: Option<String> = row.get("ip_address");
    let is_valid: bool = row.get("is_valid");
    let expires_at: DateTime<Utc> = row.get("expires_at");
    let created_at: DateTime<Utc> = row.get("created_at");

    let subject_id = SubjectId::new(subject_id)
        .map_err(|e| DomainError::storage(format!("Corrupt subject id in ledger row: {}", e)))?;

    Ok(RefreshTokenRecord::from_parts(
        id,
        subject_id,
        refresh_token,
        DeviceContext::new(user_agent, ip_address),
        is_valid,
        expires_at,
        created_at,
    ))
}
