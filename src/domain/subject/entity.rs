//! Subject entity: the authenticatable identity behind users and admins

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{validate_subject_id, SubjectValidationError};

/// Failed-login threshold after which an account is locked
pub const MAX_LOGIN_ATTEMPTS: u32 = 5;

/// How long a lockout lasts once triggered
pub const LOCK_DURATION_SECS: i64 = 2 * 60 * 60;

/// Subject identifier - alphanumeric + hyphens, max 64 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(String);

impl SubjectId {
    /// Create a new SubjectId after validation
    pub fn new(id: impl Into<String>) -> Result<Self, SubjectValidationError> {
        let id = id.into();
        validate_subject_id(&id)?;
        Ok(Self(id))
    }

    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SubjectId {
    type Error = SubjectValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SubjectId> for String {
    fn from(id: SubjectId) -> Self {
        id.0
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two kinds of subjects the service authenticates.
///
/// Access tokens are signed with a kind-specific secret, so the kind decides
/// which key a token must verify against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    User,
    Admin,
}

impl std::fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// Role carried inside signed tokens and stored on the subject record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    /// The subject kind this role belongs to
    pub fn kind(&self) -> SubjectKind {
        match self {
            Self::User => SubjectKind::User,
            Self::Admin | Self::SuperAdmin => SubjectKind::Admin,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            "super_admin" => Some(Self::SuperAdmin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Capability tags an admin may hold. `super_admin` implicitly holds all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageUsers,
    ManageProducts,
    ManageOrders,
    ManageAdmins,
    ViewAnalytics,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManageUsers => "manage_users",
            Self::ManageProducts => "manage_products",
            Self::ManageOrders => "manage_orders",
            Self::ManageAdmins => "manage_admins",
            Self::ViewAnalytics => "view_analytics",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manage_users" => Some(Self::ManageUsers),
            "manage_products" => Some(Self::ManageProducts),
            "manage_orders" => Some(Self::ManageOrders),
            "manage_admins" => Some(Self::ManageAdmins),
            "view_analytics" => Some(Self::ViewAnalytics),
            _ => None,
        }
    }
}

/// Subject entity for authentication.
///
/// One record covers both kinds: users log in with a mobile number, admins
/// with a username. The lockout counters and the password-change timestamp
/// live here because every token check reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    /// Unique identifier for the subject
    id: SubjectId,
    /// Login key: mobile number (users) or username (admins), unique per kind
    identity: String,
    /// Optional display name
    name: Option<String>,
    /// Argon2 password hash - never exposed in serialization
    #[serde(skip_serializing)]
    password_hash: String,
    /// Role, which also decides the signing key kind
    role: Role,
    /// Whether the account may authenticate at all
    is_active: bool,
    /// Consecutive failed login attempts
    #[serde(skip_serializing)]
    login_attempts: u32,
    /// Locked while `now < lock_until`
    #[serde(skip_serializing)]
    lock_until: Option<DateTime<Utc>>,
    /// Set on every post-creation password mutation
    #[serde(skip_serializing)]
    password_changed_at: Option<DateTime<Utc>>,
    /// Capability tags; only meaningful for the admin kind
    permissions: Vec<Permission>,
    /// Creation timestamp
    created_at: DateTime<Utc>,
    /// Last update timestamp
    updated_at: DateTime<Utc>,
    /// Last login timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    last_login_at: Option<DateTime<Utc>>,
}

impl Subject {
    /// Create a new user subject
    pub fn new_user(
        id: SubjectId,
        mobile_number: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self::new(id, mobile_number, password_hash, Role::User, Vec::new())
    }

    /// Create a new admin subject
    pub fn new_admin(
        id: SubjectId,
        username: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
        permissions: Vec<Permission>,
    ) -> Self {
        Self::new(id, username, password_hash, role, permissions)
    }

    fn new(
        id: SubjectId,
        identity: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
        permissions: Vec<Permission>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id,
            identity: identity.into(),
            name: None,
            password_hash: password_hash.into(),
            role,
            is_active: true,
            login_attempts: 0,
            lock_until: None,
            password_changed_at: None,
            permissions,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    /// Attach a display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    // Getters

    pub fn id(&self) -> &SubjectId {
        &self.id
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn kind(&self) -> SubjectKind {
        self.role.kind()
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn login_attempts(&self) -> u32 {
        self.login_attempts
    }

    pub fn lock_until(&self) -> Option<DateTime<Utc>> {
        self.lock_until
    }

    pub fn password_changed_at(&self) -> Option<DateTime<Utc>> {
        self.password_changed_at
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn last_login_at(&self) -> Option<DateTime<Utc>> {
        self.last_login_at
    }

    // Computed predicates - time-based state is evaluated at check time,
    // never by a background job

    /// Whether the account is currently locked out
    pub fn is_locked(&self) -> bool {
        matches!(self.lock_until, Some(until) if Utc::now() < until)
    }

    /// Whether a token issued at `issued_at` (Unix seconds) predates the last
    /// password change. Tokens minted in the same wall-clock second as the
    /// change count as stale.
    pub fn changed_password_after(&self, issued_at: i64) -> bool {
        match self.password_changed_at {
            Some(changed) => issued_at <= changed.timestamp(),
            None => false,
        }
    }

    /// Whether this admin holds the given capability
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role == Role::SuperAdmin || self.permissions.contains(&permission)
    }

    // Mutators

    /// Replace the password hash. Post-creation mutations stamp
    /// `password_changed_at` so outstanding tokens read as stale.
    pub fn set_password_hash(&mut self, password_hash: impl Into<String>) {
        self.password_hash = password_hash.into();
        self.password_changed_at = Some(Utc::now());
        self.touch();
    }

    /// Record a failed login attempt, applying the lockout policy.
    ///
    /// An expired lock resets the counter to 1 and clears the lock;
    /// otherwise the counter increments, and reaching the threshold while
    /// not locked sets `lock_until`.
    pub fn note_failed_login(&mut self) {
        let now = Utc::now();

        if matches!(self.lock_until, Some(until) if until < now) {
            self.login_attempts = 1;
            self.lock_until = None;
        } else {
            self.login_attempts += 1;
            if self.login_attempts >= MAX_LOGIN_ATTEMPTS && !self.is_locked() {
                self.lock_until = Some(now + Duration::seconds(LOCK_DURATION_SECS));
            }
        }

        self.touch();
    }

    /// Clear the attempt counter and any lock
    pub fn clear_failed_logins(&mut self) {
        self.login_attempts = 0;
        self.lock_until = None;
        self.touch();
    }

    /// Record a login
    pub fn record_login(&mut self) {
        self.last_login_at = Some(Utc::now());
    }

    /// Deactivate the subject; all of its tokens become unusable
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.touch();
    }

    /// Reactivate a deactivated subject
    pub fn activate(&mut self) {
        if !self.is_active {
            self.is_active = true;
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Reconstruct a subject from stored fields. Intended for repository
    /// implementations only.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: SubjectId,
        identity: String,
        name: Option<String>,
        password_hash: String,
        role: Role,
        is_active: bool,
        login_attempts: u32,
        lock_until: Option<DateTime<Utc>>,
        password_changed_at: Option<DateTime<Utc>>,
        permissions: Vec<Permission>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        last_login_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            identity,
            name,
            password_hash,
            role,
            is_active,
            login_attempts,
            lock_until,
            password_changed_at,
            permissions,
            created_at,
            updated_at,
            last_login_at,
        }
    }
}
