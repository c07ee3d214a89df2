//! JWT signing and validation with role-keyed secrets

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::subject::{Role, SubjectId, SubjectKind};
use crate::domain::DomainError;

/// Claims carried by access and refresh tokens alike.
///
/// The two are distinguished only by which key validates them and by ledger
/// presence (refresh only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject ID
    pub sub: String,
    /// Role at issuance
    pub role: Role,
    /// Issued at timestamp (Unix epoch seconds)
    pub iat: i64,
    /// Expiration timestamp (Unix epoch seconds)
    pub exp: i64,
}

impl TokenClaims {
    /// Create claims for a subject with the given time-to-live
    pub fn new(subject_id: &SubjectId, role: Role, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: subject_id.as_str().to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    pub fn subject_id(&self) -> &str {
        &self.sub
    }

    /// Check if the claims have expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// HMAC key pair for one signing secret
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("encoding", &"[hidden]")
            .field("decoding", &"[hidden]")
            .finish()
    }
}

impl TokenKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// The service's full key material: one access secret per subject kind plus
/// a dedicated refresh secret.
///
/// Separate access secrets per kind mean an admin token can never be
/// replayed against a user guard (or vice versa) - verification with the
/// other kind's key fails as a signature mismatch.
#[derive(Debug, Clone)]
pub struct KeySet {
    user_access: TokenKeys,
    admin_access: TokenKeys,
    refresh: TokenKeys,
}

impl KeySet {
    pub fn new(
        user_access_secret: &str,
        admin_access_secret: &str,
        refresh_secret: &str,
    ) -> Self {
        Self {
            user_access: TokenKeys::from_secret(user_access_secret),
            admin_access: TokenKeys::from_secret(admin_access_secret),
            refresh: TokenKeys::from_secret(refresh_secret),
        }
    }

    /// Access token keys for a subject kind
    pub fn access(&self, kind: SubjectKind) -> &TokenKeys {
        match kind {
            SubjectKind::User => &self.user_access,
            SubjectKind::Admin => &self.admin_access,
        }
    }

    /// Refresh token keys (shared across kinds; ledger presence scopes them)
    pub fn refresh(&self) -> &TokenKeys {
        &self.refresh
    }
}

/// Sign claims into a compact token
pub fn sign(claims: &TokenClaims, keys: &TokenKeys) -> Result<String, DomainError> {
    encode(&Header::default(), claims, &keys.encoding)
        .map_err(|e| DomainError::internal(format!("Failed to sign token: {}", e)))
}

/// Validate a compact token and return its claims.
///
/// Expiry maps to `ExpiredToken`; every other failure (bad signature,
/// malformed input) is `InvalidToken`.
pub fn verify(token: &str, keys: &TokenKeys) -> Result<TokenClaims, DomainError> {
    let mut validation = Validation::default();
    // No clock leeway: a token is expired the second its exp passes
    validation.leeway = 0;

    match decode::<TokenClaims>(token, &keys.decoding, &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) => match e.kind() {
            ErrorKind::ExpiredSignature => Err(DomainError::ExpiredToken),
            _ => Err(DomainError::invalid_token(e.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> TokenKeys {
        TokenKeys::from_secret("test-secret-key-12345")
    }

    fn subject() -> SubjectId {
        SubjectId::generate()
    }

    #[test]
    fn test_sign_and_verify() {
        let id = subject();
        let claims = TokenClaims::new(&id, Role::User, Duration::minutes(15));

        let token = sign(&claims, &keys()).unwrap();
        assert!(!token.is_empty());

        let decoded = verify(&token, &keys()).unwrap();
        assert_eq!(decoded.sub, id.as_str());
        assert_eq!(decoded.role, Role::User);
        assert!(!decoded.is_expired());
    }

    #[test]
    fn test_malformed_token() {
        let result = verify("not-a-token", &keys());
        assert!(matches!(result, Err(DomainError::InvalidToken { .. })));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let claims = TokenClaims::new(&subject(), Role::User, Duration::minutes(15));
        let token = sign(&claims, &TokenKeys::from_secret("secret-1")).unwrap();

        let result = verify(&token, &TokenKeys::from_secret("secret-2"));
        assert!(matches!(result, Err(DomainError::InvalidToken { .. })));
    }

    #[test]
    fn test_expired_token_is_distinguished() {
        let id = subject();
        let claims = TokenClaims {
            sub: id.as_str().to_string(),
            role: Role::User,
            iat: Utc::now().timestamp() - 120,
            exp: Utc::now().timestamp() - 60,
        };
        let token = sign(&claims, &keys()).unwrap();

        let result = verify(&token, &keys());
        assert!(matches!(result, Err(DomainError::ExpiredToken)));
    }

    #[test]
    fn test_cross_kind_keys_reject() {
        let keyset = KeySet::new("user-secret", "admin-secret", "refresh-secret");

        let claims = TokenClaims::new(&subject(), Role::Admin, Duration::minutes(15));
        let admin_token = sign(&claims, keyset.access(SubjectKind::Admin)).unwrap();

        // An admin-signed token dies against the user key
        let result = verify(&admin_token, keyset.access(SubjectKind::User));
        assert!(matches!(result, Err(DomainError::InvalidToken { .. })));

        // And verifies against its own key
        assert!(verify(&admin_token, keyset.access(SubjectKind::Admin)).is_ok());
    }

    #[test]
    fn test_role_survives_round_trip() {
        let keyset = KeySet::new("u", "a", "r");

        for role in [Role::User, Role::Admin, Role::SuperAdmin] {
            let claims = TokenClaims::new(&subject(), role, Duration::days(7));
            let token = sign(&claims, keyset.refresh()).unwrap();
            let decoded = verify(&token, keyset.refresh()).unwrap();
            assert_eq!(decoded.role, role);
        }
    }
}
