//! Auth service

use crate::api::{AuthApi, LoginRequest};
use crate::error::{Error, Result};
use crate::session::{NewSession, SharedSession, User, UserUpdate};
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

/// Session-aware wrapper around an [`AuthApi`]
pub struct AuthService<A> {
    api: A,
    session: SharedSession,
}

impl<A: AuthApi> AuthService<A> {
    pub fn new(api: A, session: SharedSession) -> Self {
        Self { api, session }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Sign in and install the returned credentials
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(Error::Validation(
                "email and password are required".to_string(),
            ));
        }

        self.session.write().await.set_loading(true);

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = match self.api.login(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Login failed for {}: {}", email, e);
                self.session.write().await.set_error(Some(e.to_string()));
                return Err(e);
            }
        };

        let mut new_session = NewSession::new(response.user, response.token);
        new_session.expires_at = response.expires_in.and_then(|seconds| {
            let at = expiry_after(seconds);
            if at.is_none() {
                warn!("Ignoring out-of-range expiresIn {}, using the default lifetime", seconds);
            }
            at
        });

        let mut store = self.session.write().await;
        store.set_session(new_session);
        store
            .user()
            .cloned()
            .ok_or_else(|| Error::Other("session was not established".to_string()))
    }

    pub async fn logout(&self) {
        info!("Logging out");
        self.session.write().await.clear_session();
    }

    /// Re-fetch the profile and merge it into the session
    pub async fn refresh_profile(&self) -> Result<User> {
        let token = self.bearer().await?;
        let user = self.authorized(self.api.fetch_profile(&token).await).await?;
        self.merge(&user).await
    }

    /// Apply a profile change server-side and merge the result
    pub async fn update_profile(&self, update: &UserUpdate) -> Result<User> {
        if update.is_empty() {
            return Err(Error::Validation("nothing to update".to_string()));
        }
        let token = self.bearer().await?;
        let user = self
            .authorized(self.api.update_profile(&token, update).await)
            .await?;
        self.merge(&user).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let token = self.bearer().await?;
        self.authorized(self.api.list_users(&token).await).await
    }

    async fn bearer(&self) -> Result<String> {
        self.session
            .read()
            .await
            .token()
            .map(str::to_string)
            .ok_or(Error::NoActiveSession)
    }

    /// Force a logout when the API no longer accepts the token
    async fn authorized<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_auth_failure() {
                warn!("API rejected the session token, logging out");
                self.session.write().await.clear_session();
            }
        }
        result
    }

    async fn merge(&self, user: &User) -> Result<User> {
        let mut store = self.session.write().await;
        if !store.update_user_fields(UserUpdate::from(user)) {
            return Err(Error::NoActiveSession);
        }
        store.user().cloned().ok_or(Error::NoActiveSession)
    }
}

/// `now + seconds`, or `None` when that is not a representable time
fn expiry_after(seconds: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(seconds).and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
}
