//! Storefront Auth Service
//!
//! Authentication and session-token lifecycle for the storefront backend:
//! - Access/refresh token pairs with role-keyed signing
//! - Ledger-backed refresh tokens with single-use rotation
//! - Account lockout and password-staleness enforcement
//! - Request guards for user and admin routes

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use rand::Rng;
use tracing::{info, warn};

use api::AppState;
use config::StorageBackend;
use domain::subject::{Role, SubjectKind, SubjectRepository};
use domain::TokenLedger;
use infrastructure::auth::{Argon2Hasher, TokenConfig, TokenService};
use infrastructure::subject::{
    CreateAdminRequest, InMemorySubjectRepository, PostgresSubjectRepository, SubjectService,
};
use infrastructure::token::{InMemoryTokenLedger, PostgresTokenLedger};

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration.
///
/// Store connectivity is the one fatal startup condition: a postgres
/// backend that cannot connect aborts rather than serving degraded
/// traffic.
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let auth = &config.auth;
    if auth.user_access_secret.is_empty()
        || auth.admin_access_secret.is_empty()
        || auth.refresh_secret.is_empty()
    {
        return Err(domain::DomainError::configuration("Signing secrets must be non-empty").into());
    }

    if auth.user_access_secret.starts_with("change-me") {
        warn!("Using development signing secrets; configure auth secrets for production");
    }

    let (subject_repository, ledger): (Arc<dyn SubjectRepository>, Arc<dyn TokenLedger>) =
        match config.storage.backend {
            StorageBackend::Postgres => {
                let database_url = std::env::var("DATABASE_URL").map_err(|_| {
                    anyhow::anyhow!(
                        "DATABASE_URL environment variable is required for the postgres backend"
                    )
                })?;

                info!("Connecting to PostgreSQL...");
                let pool = sqlx::PgPool::connect(&database_url)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to connect to PostgreSQL: {}", e))?;

                infrastructure::storage::ensure_schema(&pool).await?;
                info!("PostgreSQL connection established");

                (
                    Arc::new(PostgresSubjectRepository::new(pool.clone())),
                    Arc::new(PostgresTokenLedger::new(pool)),
                )
            }
            StorageBackend::Memory => {
                info!("Using in-memory storage");
                (
                    Arc::new(InMemorySubjectRepository::new()),
                    Arc::new(InMemoryTokenLedger::new()),
                )
            }
        };

    let subject_service = Arc::new(SubjectService::new(
        subject_repository,
        Arc::new(Argon2Hasher::new()),
    ));

    let token_service = Arc::new(TokenService::new(
        ledger,
        TokenConfig {
            user_access_secret: config.auth.user_access_secret.clone(),
            admin_access_secret: config.auth.admin_access_secret.clone(),
            refresh_secret: config.auth.refresh_secret.clone(),
            access_token_minutes: config.auth.access_token_minutes,
            refresh_token_days: config.auth.refresh_token_days,
        },
    ));

    seed_initial_admin(&subject_service).await?;

    Ok(AppState::new(subject_service, token_service))
}

/// Create a bootstrap super admin when no admin accounts exist yet.
/// The generated password is logged once and never stored in the clear.
async fn seed_initial_admin(subject_service: &SubjectService) -> anyhow::Result<()> {
    if subject_service.count(Some(SubjectKind::Admin)).await? > 0 {
        return Ok(());
    }

    let password = generate_password(20);

    let admin = subject_service
        .create_admin(CreateAdminRequest {
            username: "admin".to_string(),
            password: password.clone(),
            role: Role::SuperAdmin,
            permissions: Vec::new(),
        })
        .await?;

    info!(
        username = %admin.identity(),
        password = %password,
        "Created initial super admin; change this password immediately"
    );

    Ok(())
}

fn generate_password(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_password_shape() {
        let password = generate_password(20);
        assert_eq!(password.len(), 20);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generated_passwords_differ() {
        assert_ne!(generate_password(20), generate_password(20));
    }

    #[tokio::test]
    async fn test_in_memory_state_seeds_super_admin() {
        let state = create_app_state().await.unwrap();

        let admin = state
            .subject_service
            .get_by_identity(SubjectKind::Admin, "admin")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role(), Role::SuperAdmin);

        // Seeding is idempotent at the count level
        assert_eq!(
            state
                .subject_service
                .count(Some(SubjectKind::Admin))
                .await
                .unwrap(),
            1
        );
    }
}
