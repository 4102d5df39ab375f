//! Session state container
//!
//! All mutation of the session goes through the named transitions on
//! [`SessionStore`]. Each transition updates the in-memory record and mirrors
//! it to the short-lived store. Storage problems never escape a transition:
//! corrupted values are deleted and the session falls back to
//! unauthenticated, failed writes are logged.

use crate::config::{SessionConfig, DEFAULT_TOKEN_TTL_MINUTES};
use crate::error::{Error, Result};
use crate::session::models::{AuthStatus, NewSession, Session, User, UserUpdate};
use crate::storage::{Storage, StorageArea, StorageKey};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Session context shared between the guard, services and commands
pub type SharedSession = Arc<RwLock<SessionStore>>;

/// Credentials found in one of the stores
#[derive(Debug, Clone)]
struct StoredCredentials {
    token: String,
    user: User,
    expiry: Option<DateTime<Utc>>,
}

/// What a store holds under the session keys
#[derive(Debug)]
enum Stored {
    Empty,
    Complete(StoredCredentials),
    /// Only one of token and user is present
    Partial,
    /// A value failed to decode
    Corrupted(StorageKey),
}

/// Owner of the session record and its storage mirror
pub struct SessionStore {
    session: Session,
    storage: Storage,
    token_ttl: Duration,
}

impl SessionStore {
    pub fn new(storage: Storage, config: &SessionConfig) -> Self {
        Self {
            session: Session::default(),
            storage,
            token_ttl: config.token_ttl().unwrap_or_else(|| {
                warn!(
                    "Unusable token_ttl_minutes {}, using {}",
                    config.token_ttl_minutes, DEFAULT_TOKEN_TTL_MINUTES
                );
                Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES)
            }),
        }
    }

    /// Build a store, restore it from storage and wrap it for sharing
    pub fn bootstrap_shared(storage: Storage, config: &SessionConfig) -> SharedSession {
        let mut store = Self::new(storage, config);
        store.bootstrap();
        Arc::new(RwLock::new(store))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn token(&self) -> Option<&str> {
        self.session.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.session.user.as_ref()
    }

    pub fn auth_status(&self) -> AuthStatus {
        self.session.auth_status
    }

    /// Startup sequence: restore from the short-lived store, then adopt any
    /// credentials left in the durable store by older clients.
    pub fn bootstrap(&mut self) -> AuthStatus {
        self.restore_session();
        self.migrate_legacy_storage();
        self.session.auth_status
    }

    /// set-session: install a fresh login
    pub fn set_session(&mut self, new: NewSession) {
        let NewSession {
            mut user,
            token,
            role,
            permissions,
            has_updated_password,
            expires_at,
        } = new;

        if let Some(role) = role {
            user.role = role;
        }
        if let Some(permissions) = permissions {
            user.permissions = permissions;
        }
        if let Some(flag) = has_updated_password {
            user.has_updated_password = flag;
        }
        user.recompute_full_name();

        let expiry = truncate_to_millis(expires_at.unwrap_or_else(|| self.default_expiry()));
        info!("Session established for {}", user.email);

        self.apply(StoredCredentials {
            token,
            user,
            expiry: Some(expiry),
        });
        self.mirror_credentials();
        self.log_failure("clear durable store", self.storage.clear(StorageArea::Durable));
    }

    /// clear-session: forget the user and wipe both stores
    pub fn clear_session(&mut self) {
        if self.session.is_authenticated() {
            info!("Session cleared");
        }
        self.session = Session {
            auth_status: AuthStatus::Unauthenticated,
            ..Session::default()
        };
        self.log_failure("clear session store", self.storage.clear(StorageArea::Session));
        self.log_failure("clear durable store", self.storage.clear(StorageArea::Durable));
    }

    /// restore-session: load the session from the short-lived store
    pub fn restore_session(&mut self) -> AuthStatus {
        match self.read_stored(StorageArea::Session) {
            Stored::Complete(credentials) => {
                debug!("Restored session for {}", credentials.user.email);
                self.apply(credentials);
            }
            Stored::Empty => self.reset_unauthenticated(),
            Stored::Partial => {
                warn!("Session store holds only half a session, clearing it");
                self.discard(StorageArea::Session);
                self.reset_unauthenticated();
            }
            Stored::Corrupted(key) => {
                warn!("{} in session store, clearing it", corrupted(key));
                self.discard(StorageArea::Session);
                self.reset_unauthenticated();
            }
        }
        self.session.auth_status
    }

    /// update-user-fields: merge a partial record into the current user.
    ///
    /// Returns false when there is no user to update.
    pub fn update_user_fields(&mut self, update: UserUpdate) -> bool {
        let Some(user) = self.session.user.as_mut() else {
            debug!("Ignoring user update without an active session");
            return false;
        };

        let both_names = update.first_name.is_some() && update.last_name.is_some();
        if let Some(first_name) = update.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            user.last_name = last_name;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(permissions) = update.permissions {
            user.permissions = permissions;
        }
        if let Some(verified) = update.is_email_verified {
            user.is_email_verified = verified;
        }
        if let Some(flag) = update.has_updated_password {
            user.has_updated_password = flag;
        }
        if both_names {
            user.rebuild_full_name();
        }

        self.session.role = Some(user.role);
        self.session.permissions = user.permissions.clone();
        self.mirror_user();
        true
    }

    /// Replace the permission set of the current user
    pub fn set_permissions(&mut self, permissions: Vec<String>) -> bool {
        self.update_user_fields(UserUpdate {
            permissions: Some(permissions),
            ..Default::default()
        })
    }

    /// migrate-legacy-storage: move credentials out of the durable store.
    ///
    /// The durable keys are always erased. Returns true when the legacy
    /// credentials became the current session.
    pub fn migrate_legacy_storage(&mut self) -> bool {
        let adopted = match self.read_stored(StorageArea::Durable) {
            Stored::Complete(mut credentials) if !self.session.is_authenticated() => {
                info!("Migrating legacy session for {}", credentials.user.email);
                credentials.user.recompute_full_name();
                if credentials.expiry.is_none() {
                    credentials.expiry = Some(truncate_to_millis(self.default_expiry()));
                }
                self.apply(credentials);
                self.mirror_credentials();
                true
            }
            Stored::Complete(_) => {
                debug!("Already authenticated, dropping legacy credentials");
                false
            }
            Stored::Empty => false,
            Stored::Partial => {
                warn!("Durable store holds only half a session, dropping it");
                false
            }
            Stored::Corrupted(key) => {
                warn!("{} in durable store, dropping it", corrupted(key));
                false
            }
        };
        self.discard(StorageArea::Durable);
        adopted
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.session.loading = loading;
    }

    /// Record a failure for display. Setting an error ends loading.
    pub fn set_error(&mut self, error: Option<String>) {
        if error.is_some() {
            self.session.loading = false;
        }
        self.session.error = error;
    }

    /// Now plus the configured lifetime, saturating at the latest representable time
    fn default_expiry(&self) -> DateTime<Utc> {
        Utc::now()
            .checked_add_signed(self.token_ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn apply(&mut self, credentials: StoredCredentials) {
        let StoredCredentials {
            token,
            user,
            expiry,
        } = credentials;
        self.session = Session {
            role: Some(user.role),
            permissions: user.permissions.clone(),
            user: Some(user),
            token: Some(token),
            auth_status: AuthStatus::Authenticated,
            token_expiry: expiry,
            loading: false,
            error: None,
        };
    }

    fn reset_unauthenticated(&mut self) {
        self.session = Session {
            auth_status: AuthStatus::Unauthenticated,
            ..Session::default()
        };
    }

    fn read_stored(&self, area: StorageArea) -> Stored {
        match read_credentials(&self.storage, area) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Failed to read {} store: {}", area, e);
                Stored::Empty
            }
        }
    }

    fn discard(&self, area: StorageArea) {
        self.log_failure("discard stored session", self.storage.clear(area));
    }

    fn mirror_credentials(&self) {
        if let Some(token) = &self.session.token {
            self.log_failure(
                "write token",
                self.storage
                    .set(StorageArea::Session, StorageKey::AuthToken, token),
            );
        }
        if let Some(expiry) = self.session.token_expiry {
            self.log_failure(
                "write token expiry",
                self.storage.set(
                    StorageArea::Session,
                    StorageKey::TokenExpiry,
                    &expiry.timestamp_millis().to_string(),
                ),
            );
        }
        self.mirror_user();
    }

    fn mirror_user(&self) {
        let Some(user) = &self.session.user else {
            return;
        };
        let result = serde_json::to_string(user)
            .map_err(Into::into)
            .and_then(|json| {
                self.storage
                    .set(StorageArea::Session, StorageKey::UserData, &json)
            });
        self.log_failure("write user", result);
    }

    fn log_failure(&self, action: &str, result: Result<()>) {
        if let Err(e) = result {
            warn!("Failed to {}: {}", action, e);
        }
    }
}

/// Decode the session keys of one store
fn read_credentials(storage: &Storage, area: StorageArea) -> Result<Stored> {
    let token = storage.get(area, StorageKey::AuthToken)?;
    let user_raw = storage.get(area, StorageKey::UserData)?;
    let expiry_raw = storage.get(area, StorageKey::TokenExpiry)?;

    let user = match user_raw {
        Some(raw) => match serde_json::from_str::<User>(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                debug!("Failed to decode {} in {} store: {}", StorageKey::UserData, area, e);
                return Ok(Stored::Corrupted(StorageKey::UserData));
            }
        },
        None => None,
    };

    let expiry = match expiry_raw {
        Some(raw) => match parse_expiry(&raw) {
            Some(expiry) => Some(expiry),
            None => return Ok(Stored::Corrupted(StorageKey::TokenExpiry)),
        },
        None => None,
    };

    Ok(match (token, user) {
        (Some(token), Some(user)) => Stored::Complete(StoredCredentials {
            token,
            user,
            expiry,
        }),
        (None, None) if expiry.is_none() => Stored::Empty,
        _ => Stored::Partial,
    })
}

fn corrupted(key: StorageKey) -> Error {
    Error::StorageCorrupted(key.to_string())
}

/// Expiries are stored as epoch milliseconds; keep the in-memory copy equal
/// to what a restore would read back.
fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

/// Parse an epoch-millisecond timestamp
pub fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}
