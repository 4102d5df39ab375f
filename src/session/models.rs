//! Session models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dashboard roles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, including settings and other admins
    SuperAdmin,
    Admin,
    /// Can act on users and predictions but not settings
    Moderator,
    Support,
    /// Read-only access
    #[default]
    Viewer,
    /// A role this client does not know about
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::SuperAdmin => write!(f, "super_admin"),
            Role::Admin => write!(f, "admin"),
            Role::Moderator => write!(f, "moderator"),
            Role::Support => write!(f, "support"),
            Role::Viewer => write!(f, "viewer"),
            Role::Unknown => write!(f, "unknown"),
        }
    }
}

/// Signed-in user, as returned by the API and stored under `userData`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub is_email_verified: bool,
    #[serde(default)]
    pub has_updated_password: bool,
}

impl User {
    pub fn new(id: impl Into<String>, first_name: &str, last_name: &str, email: &str) -> Self {
        let mut user = Self {
            id: id.into(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            full_name: String::new(),
            email: email.to_string(),
            role: Role::default(),
            permissions: Vec::new(),
            is_email_verified: false,
            has_updated_password: false,
        };
        user.recompute_full_name();
        user
    }

    /// Rebuild `full_name` when both name parts are present
    pub fn recompute_full_name(&mut self) {
        if !self.first_name.is_empty() && !self.last_name.is_empty() {
            self.full_name = format!("{} {}", self.first_name, self.last_name);
        }
    }

    /// Rebuild `full_name` from whatever the name parts hold, blanks included
    pub fn rebuild_full_name(&mut self) {
        self.full_name = format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string();
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::SuperAdmin | Role::Admin)
    }
}

/// Partial user record for profile updates. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_email_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_updated_password: Option<bool>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<&User> for UserUpdate {
    /// Every field of `user`, for overwriting a stale copy
    fn from(user: &User) -> Self {
        Self {
            first_name: Some(user.first_name.clone()),
            last_name: Some(user.last_name.clone()),
            email: Some(user.email.clone()),
            role: Some(user.role),
            permissions: Some(user.permissions.clone()),
            is_email_verified: Some(user.is_email_verified),
            has_updated_password: Some(user.has_updated_password),
        }
    }
}

/// Authentication status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthStatus {
    /// Storage has not been read yet
    Idle,
    Authenticated,
    Unauthenticated,
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthStatus::Idle => write!(f, "IDLE"),
            AuthStatus::Authenticated => write!(f, "AUTHENTICATED"),
            AuthStatus::Unauthenticated => write!(f, "UNAUTHENTICATED"),
        }
    }
}

/// In-memory session record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
    pub role: Option<Role>,
    pub permissions: Vec<String>,
    pub auth_status: AuthStatus,
    pub token_expiry: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub loading: bool,
    #[serde(skip)]
    pub error: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.auth_status == AuthStatus::Authenticated
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self {
            user: None,
            token: None,
            role: None,
            permissions: Vec::new(),
            auth_status: AuthStatus::Idle,
            token_expiry: None,
            loading: false,
            error: None,
        }
    }
}

/// Input to the set-session transition
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user: User,
    pub token: String,
    /// Overrides `user.role` when given
    pub role: Option<Role>,
    /// Overrides `user.permissions` when given
    pub permissions: Option<Vec<String>>,
    pub has_updated_password: Option<bool>,
    /// Defaults to now plus the configured token lifetime
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewSession {
    pub fn new(user: User, token: impl Into<String>) -> Self {
        Self {
            user,
            token: token.into(),
            role: None,
            permissions: None,
            has_updated_password: None,
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}
