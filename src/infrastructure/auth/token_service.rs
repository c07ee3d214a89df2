//! Token service: issues, verifies, rotates, and revokes token pairs
//!
//! Access tokens are stateless and verified cryptographically only; refresh
//! tokens are additionally backed by a ledger record, which is the only
//! revocable artifact. Rotation-on-use limits replay of a stolen refresh
//! token to a single extra use.

use std::fmt::Debug;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::domain::subject::{Role, SubjectId, SubjectKind};
use crate::domain::token::{DeviceContext, RefreshTokenRecord, TokenLedger};
use crate::domain::DomainError;

use super::jwt::{self, KeySet, TokenClaims};

const REFRESH_REJECTION: &str = "Invalid or expired refresh token";

/// Configuration for the token service
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Signing secret for user access tokens
    pub user_access_secret: String,
    /// Signing secret for admin access tokens
    pub admin_access_secret: String,
    /// Signing secret for refresh tokens
    pub refresh_secret: String,
    /// Access token lifetime in minutes
    pub access_token_minutes: i64,
    /// Refresh token lifetime in days
    pub refresh_token_days: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            user_access_secret: "change-me-user-access".to_string(),
            admin_access_secret: "change-me-admin-access".to_string(),
            refresh_secret: "change-me-refresh".to_string(),
            access_token_minutes: 15,
            refresh_token_days: 7,
        }
    }
}

/// A freshly issued access/refresh token pair
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues, verifies, rotates, and revokes token pairs against the ledger
pub struct TokenService {
    ledger: Arc<dyn TokenLedger>,
    keys: KeySet,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl TokenService {
    pub fn new(ledger: Arc<dyn TokenLedger>, config: TokenConfig) -> Self {
        let keys = KeySet::new(
            &config.user_access_secret,
            &config.admin_access_secret,
            &config.refresh_secret,
        );

        Self {
            ledger,
            keys,
            access_ttl: Duration::minutes(config.access_token_minutes),
            refresh_ttl: Duration::days(config.refresh_token_days),
        }
    }

    /// Issue a signed access/refresh pair and persist the refresh token in
    /// the ledger (one insertion).
    pub async fn issue_pair(
        &self,
        subject_id: &SubjectId,
        role: Role,
        device: DeviceContext,
    ) -> Result<TokenPair, DomainError> {
        let access_claims = TokenClaims::new(subject_id, role, self.access_ttl);
        let access_token = jwt::sign(&access_claims, self.keys.access(role.kind()))?;

        let refresh_claims = TokenClaims::new(subject_id, role, self.refresh_ttl);
        let refresh_token = jwt::sign(&refresh_claims, self.keys.refresh())?;

        let record = RefreshTokenRecord::new(
            subject_id.clone(),
            &refresh_token,
            device,
            Utc::now() + self.refresh_ttl,
        );
        self.ledger.insert(record).await?;

        debug!(subject_id = %subject_id, role = %role, "Issued token pair");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Cryptographically validate an access token against the key for the
    /// expected subject kind.
    ///
    /// A token signed with the other kind's key fails as a signature
    /// mismatch; a token that verifies but carries a role of the wrong kind
    /// is rejected the same way.
    pub fn verify_access_token(
        &self,
        token: &str,
        expected: SubjectKind,
    ) -> Result<TokenClaims, DomainError> {
        let claims = jwt::verify(token, self.keys.access(expected))?;

        if claims.role.kind() != expected {
            return Err(DomainError::invalid_token(format!(
                "token role '{}' is not a {} role",
                claims.role, expected
            )));
        }

        Ok(claims)
    }

    /// Validate a refresh token: signature and expiry first, then a ledger
    /// record that is still usable and owned by the token's subject.
    ///
    /// Every failure collapses to the same rejection - a cryptographically
    /// valid but ledger-revoked token is indistinguishable from a forged
    /// one to the caller.
    pub async fn verify_refresh_token(&self, token: &str) -> Result<TokenClaims, DomainError> {
        let claims = jwt::verify(token, self.keys.refresh())
            .map_err(|_| DomainError::invalid_token(REFRESH_REJECTION))?;

        let record = self
            .ledger
            .find_valid(token)
            .await?
            .ok_or_else(|| DomainError::invalid_token(REFRESH_REJECTION))?;

        if record.subject_id().as_str() != claims.sub {
            return Err(DomainError::invalid_token(REFRESH_REJECTION));
        }

        Ok(claims)
    }

    /// Redeem a refresh token for a fresh pair, invalidating the old one.
    ///
    /// Single-use rotation: the atomic find-and-invalidate on the ledger
    /// picks exactly one winner when concurrent requests race on the same
    /// token; losers are rejected as if the token were forged.
    pub async fn rotate(
        &self,
        token: &str,
        device: DeviceContext,
    ) -> Result<TokenPair, DomainError> {
        let claims = self.verify_refresh_token(token).await?;

        if !self.ledger.invalidate_if_valid(token).await? {
            return Err(DomainError::invalid_token(REFRESH_REJECTION));
        }

        let subject_id = SubjectId::new(&claims.sub)
            .map_err(|_| DomainError::invalid_token(REFRESH_REJECTION))?;

        self.issue_pair(&subject_id, claims.role, device).await
    }

    /// Mark one refresh token invalid. Idempotent: invalidating an unknown
    /// or already-invalid token is not an error.
    pub async fn invalidate(&self, token: &str) -> Result<(), DomainError> {
        self.ledger.invalidate(token).await
    }

    /// Mark every ledger record owned by the subject invalid in one bulk
    /// update. Used for logout-all, forced password-change logout,
    /// deactivation, and deletion.
    pub async fn invalidate_all_for_subject(
        &self,
        subject_id: &SubjectId,
    ) -> Result<u64, DomainError> {
        let revoked = self.ledger.invalidate_all_for_subject(subject_id).await?;
        debug!(subject_id = %subject_id, revoked, "Invalidated all refresh tokens");
        Ok(revoked)
    }

    /// Count usable refresh tokens for one subject
    pub async fn active_sessions_for_subject(
        &self,
        subject_id: &SubjectId,
    ) -> Result<u64, DomainError> {
        self.ledger.count_valid_for_subject(subject_id).await
    }

    /// Count usable refresh tokens across all subjects
    pub async fn active_sessions(&self) -> Result<u64, DomainError> {
        self.ledger.count_valid().await
    }

    /// Delete ledger records past their expiry. Expired records are already
    /// excluded from every validity query; this reclaims the rows.
    pub async fn sweep_expired(&self) -> Result<u64, DomainError> {
        self.ledger.delete_expired().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::token::InMemoryTokenLedger;

    fn service() -> TokenService {
        TokenService::new(Arc::new(InMemoryTokenLedger::new()), TokenConfig::default())
    }

    fn device() -> DeviceContext {
        DeviceContext::new(Some("test-agent".to_string()), Some("127.0.0.1".to_string()))
    }

    #[tokio::test]
    async fn test_issue_then_verify_access() {
        let service = service();
        let id = SubjectId::generate();

        let pair = service.issue_pair(&id, Role::User, device()).await.unwrap();

        let claims = service
            .verify_access_token(&pair.access_token, SubjectKind::User)
            .unwrap();
        assert_eq!(claims.sub, id.as_str());
        assert_eq!(claims.role, Role::User);
    }

    #[tokio::test]
    async fn test_role_isolation() {
        let service = service();
        let id = SubjectId::generate();

        let user_pair = service.issue_pair(&id, Role::User, device()).await.unwrap();
        let admin_pair = service
            .issue_pair(&id, Role::Admin, device())
            .await
            .unwrap();

        // User token against the admin guard and vice versa both fail
        assert!(service
            .verify_access_token(&user_pair.access_token, SubjectKind::Admin)
            .is_err());
        assert!(service
            .verify_access_token(&admin_pair.access_token, SubjectKind::User)
            .is_err());

        // Each verifies against its own kind
        assert!(service
            .verify_access_token(&user_pair.access_token, SubjectKind::User)
            .is_ok());
        assert!(service
            .verify_access_token(&admin_pair.access_token, SubjectKind::Admin)
            .is_ok());
    }

    #[tokio::test]
    async fn test_super_admin_verifies_as_admin_kind() {
        let service = service();
        let id = SubjectId::generate();

        let pair = service
            .issue_pair(&id, Role::SuperAdmin, device())
            .await
            .unwrap();

        let claims = service
            .verify_access_token(&pair.access_token, SubjectKind::Admin)
            .unwrap();
        assert_eq!(claims.role, Role::SuperAdmin);
    }

    #[tokio::test]
    async fn test_verify_refresh_token() {
        let service = service();
        let id = SubjectId::generate();

        let pair = service.issue_pair(&id, Role::User, device()).await.unwrap();

        let claims = service
            .verify_refresh_token(&pair.refresh_token)
            .await
            .unwrap();
        assert_eq!(claims.sub, id.as_str());
    }

    #[tokio::test]
    async fn test_access_token_is_not_a_refresh_token() {
        let service = service();
        let id = SubjectId::generate();

        let pair = service.issue_pair(&id, Role::User, device()).await.unwrap();

        // Signed with the access key, so the refresh key rejects it
        let result = service.verify_refresh_token(&pair.access_token).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_rotation_is_single_use() {
        let service = service();
        let id = SubjectId::generate();

        let pair = service.issue_pair(&id, Role::User, device()).await.unwrap();

        let rotated = service
            .rotate(&pair.refresh_token, device())
            .await
            .unwrap();
        assert_ne!(rotated.refresh_token, pair.refresh_token);

        // The original token is spent
        let replay = service.verify_refresh_token(&pair.refresh_token).await;
        assert!(matches!(replay, Err(DomainError::InvalidToken { .. })));

        let rotate_again = service.rotate(&pair.refresh_token, device()).await;
        assert!(rotate_again.is_err());

        // The replacement works
        assert!(service
            .verify_refresh_token(&rotated.refresh_token)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let service = service();
        let id = SubjectId::generate();

        let pair = service.issue_pair(&id, Role::User, device()).await.unwrap();

        service.invalidate(&pair.refresh_token).await.unwrap();
        // Second invalidation of the same token is a no-op
        service.invalidate(&pair.refresh_token).await.unwrap();
        // So is invalidating a token that never existed
        service.invalidate("never-issued").await.unwrap();

        assert!(service
            .verify_refresh_token(&pair.refresh_token)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_invalidate_all_for_subject() {
        let service = service();
        let id = SubjectId::generate();
        let other = SubjectId::generate();

        let pair1 = service.issue_pair(&id, Role::User, device()).await.unwrap();
        let pair2 = service.issue_pair(&id, Role::User, device()).await.unwrap();
        let other_pair = service
            .issue_pair(&other, Role::User, device())
            .await
            .unwrap();

        let revoked = service.invalidate_all_for_subject(&id).await.unwrap();
        assert_eq!(revoked, 2);

        assert!(service.verify_refresh_token(&pair1.refresh_token).await.is_err());
        assert!(service.verify_refresh_token(&pair2.refresh_token).await.is_err());

        // Another subject's session is untouched
        assert!(service
            .verify_refresh_token(&other_pair.refresh_token)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_session_counts() {
        let service = service();
        let id = SubjectId::generate();

        assert_eq!(service.active_sessions().await.unwrap(), 0);

        service.issue_pair(&id, Role::User, device()).await.unwrap();
        service.issue_pair(&id, Role::User, device()).await.unwrap();

        assert_eq!(service.active_sessions().await.unwrap(), 2);
        assert_eq!(
            service.active_sessions_for_subject(&id).await.unwrap(),
            2
        );

        service.invalidate_all_for_subject(&id).await.unwrap();
        assert_eq!(service.active_sessions().await.unwrap(), 0);
    }
}
