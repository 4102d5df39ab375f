//! Session guard
//!
//! Gates protected operations behind a token check. Every activation starts
//! in [`GuardState::Checking`] and ends in either `Authorized` or
//! `Redirecting`; a failed check clears the session before redirecting.

use crate::config::GuardConfig;
use crate::session::{parse_expiry, SessionStore, SharedSession};
use crate::storage::{StorageArea, StorageKey};
use chrono::{DateTime, Utc};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Where the guard is in its check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Checking,
    Authorized,
    Redirecting { to: String },
}

impl GuardState {
    pub fn is_authorized(&self) -> bool {
        matches!(self, GuardState::Authorized)
    }
}

/// Why a check failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingToken,
    MalformedToken { length: usize },
    MalformedExpiry,
    Expired { at: DateTime<Utc> },
    /// The token was removed from the shared store by someone else
    Revoked,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingToken => write!(f, "no token"),
            Rejection::MalformedToken { length } => {
                write!(f, "token too short ({} characters)", length)
            }
            Rejection::MalformedExpiry => write!(f, "unreadable token expiry"),
            Rejection::Expired { at } => write!(f, "token expired at {}", at.to_rfc3339()),
            Rejection::Revoked => write!(f, "token removed by another session"),
        }
    }
}

pub struct SessionGuard {
    session: SharedSession,
    config: GuardConfig,
    state: GuardState,
    rejection: Option<Rejection>,
}

impl SessionGuard {
    pub fn new(session: SharedSession, config: GuardConfig) -> Self {
        Self {
            session,
            config,
            state: GuardState::Checking,
            rejection: None,
        }
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    /// Reason for the last redirect, if any
    pub fn rejection(&self) -> Option<&Rejection> {
        self.rejection.as_ref()
    }

    /// Run a fresh check
    pub async fn activate(&mut self) -> &GuardState {
        self.state = GuardState::Checking;
        self.rejection = None;

        let session = self.session.clone();
        let mut store = session.write().await;
        let verdict = check(&mut store, &self.config, Utc::now());
        match verdict {
            Ok(()) => {
                debug!("Guard check passed");
                self.state = GuardState::Authorized;
            }
            Err(reason) => {
                self.reject(&mut store, reason);
            }
        }
        &self.state
    }

    /// Produce protected content only when the last check passed
    pub fn render<T>(&self, content: impl FnOnce() -> T) -> Option<T> {
        self.state.is_authorized().then(content)
    }

    /// Activate, then run `content` if the check passed
    pub async fn protect<T, F, Fut>(&mut self, content: F) -> Option<T>
    where
        F: FnOnce(SharedSession) -> Fut,
        Fut: Future<Output = T>,
    {
        if !self.activate().await.is_authorized() {
            return None;
        }
        Some(content(self.session.clone()).await)
    }

    /// Wait until the token disappears from the short-lived store, then
    /// clear the session and redirect.
    ///
    /// File-backed stores are re-read every `poll_interval_ms` so removals
    /// made by other processes are seen. Returns immediately unless the guard
    /// is authorized.
    pub async fn watch(&mut self) -> &GuardState {
        if !self.state.is_authorized() {
            return &self.state;
        }

        let storage = self.session.read().await.storage().clone();
        let mut events = storage.subscribe(StorageArea::Session);
        let mut ticker =
            tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms.max(1)));

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) if event.is_removal_of(StorageKey::AuthToken) => break,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Guard missed {} storage events, rechecking", skipped);
                        if matches!(storage.get(StorageArea::Session, StorageKey::AuthToken), Ok(None)) {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => return &self.state,
                },
                _ = ticker.tick() => {
                    if let Err(e) = storage.refresh(StorageArea::Session) {
                        warn!("Failed to refresh session store: {}", e);
                    }
                }
            }
        }

        let session = self.session.clone();
        let mut store = session.write().await;
        self.reject(&mut store, Rejection::Revoked);
        &self.state
    }

    fn reject(&mut self, store: &mut SessionStore, reason: Rejection) {
        info!("Guard redirecting to {}: {}", self.config.login_path, reason);
        store.clear_session();
        self.state = GuardState::Redirecting {
            to: self.config.login_path.clone(),
        };
        self.rejection = Some(reason);
    }
}

/// Validate the token and expiry held by `store` at `now`
fn check(
    store: &mut SessionStore,
    config: &GuardConfig,
    now: DateTime<Utc>,
) -> Result<(), Rejection> {
    // Another context may have logged in since this one was restored
    if store.token().is_none() {
        let persisted = store
            .storage()
            .get(StorageArea::Session, StorageKey::AuthToken)
            .ok()
            .flatten();
        if persisted.is_some() {
            store.restore_session();
        }
    }

    let token = store.token().ok_or(Rejection::MissingToken)?;
    let length = token.chars().count();
    if length < config.min_token_length {
        return Err(Rejection::MalformedToken { length });
    }

    let expiry = match store.session().token_expiry {
        Some(expiry) => Some(expiry),
        None => match store
            .storage()
            .get(StorageArea::Session, StorageKey::TokenExpiry)
            .ok()
            .flatten()
        {
            Some(raw) => Some(parse_expiry(&raw).ok_or(Rejection::MalformedExpiry)?),
            None => None,
        },
    };

    match expiry {
        Some(at) if at <= now => Err(Rejection::Expired { at }),
        _ => Ok(()),
    }
}
