//! Shared test helpers

#![allow(dead_code)]

use admin_session::api::{AuthApi, LoginRequest, LoginResponse};
use admin_session::config::{GuardConfig, SessionConfig};
use admin_session::error::{Error, Result};
use admin_session::session::{SessionStore, SharedSession, User, UserUpdate};
use admin_session::storage::Storage;
use parking_lot::Mutex;
use std::collections::HashMap;

pub const VALID_TOKEN: &str = "tok-0123456789abcdef";
pub const RESET_TOKEN: &str = "482913";
pub const PASSWORD: &str = "correct-horse";

pub fn user(id: &str, first: &str, last: &str) -> User {
    User::new(
        id,
        first,
        last,
        &format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
    )
}

pub fn session_store(storage: Storage) -> SessionStore {
    SessionStore::new(storage, &SessionConfig::default())
}

pub fn shared_session(storage: Storage) -> SharedSession {
    SessionStore::bootstrap_shared(storage, &SessionConfig::default())
}

pub fn guard_config() -> GuardConfig {
    GuardConfig {
        poll_interval_ms: 10,
        ..GuardConfig::default()
    }
}

/// In-process stand-in for the REST API
pub struct FakeApi {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<&'static str, (u16, String)>>,
    pub profile: Mutex<User>,
    pub users: Vec<User>,
    pub expires_in: Option<i64>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            profile: Mutex::new(user("u1", "Ada", "Lovelace")),
            users: vec![
                user("u1", "Ada", "Lovelace"),
                user("u2", "Grace", "Hopper"),
                user("u3", "Alan", "Turing"),
            ],
            expires_in: Some(3600),
        }
    }

    /// Make every call to `method` fail with `status`
    pub fn fail(&self, method: &'static str, status: u16, message: &str) {
        self.failures
            .lock()
            .insert(method, (status, message.to_string()));
    }

    pub fn recover(&self, method: &'static str) {
        self.failures.lock().remove(method);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == method).count()
    }

    fn record(&self, method: &'static str) -> Result<()> {
        self.calls.lock().push(method.to_string());
        match self.failures.lock().get(method) {
            Some((401, message)) => Err(Error::Unauthorized(message.clone())),
            Some((status, message)) => Err(Error::Api {
                status: *status,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn check_bearer(&self, bearer: &str) -> Result<()> {
        if bearer == VALID_TOKEN {
            Ok(())
        } else {
            Err(Error::Unauthorized("invalid token".to_string()))
        }
    }
}

impl AuthApi for FakeApi {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        self.record("login")?;
        if request.password != PASSWORD {
            return Err(Error::Api {
                status: 422,
                message: "Invalid email or password".to_string(),
            });
        }
        let mut user = self.profile.lock().clone();
        user.email = request.email.clone();
        Ok(LoginResponse {
            token: VALID_TOKEN.to_string(),
            user,
            expires_in: self.expires_in,
        })
    }

    async fn request_password_reset(&self, _email: &str) -> Result<()> {
        self.record("request_password_reset")
    }

    async fn verify_reset_token(&self, _email: &str, token: &str) -> Result<()> {
        self.record("verify_reset_token")?;
        if token != RESET_TOKEN {
            return Err(Error::Api {
                status: 400,
                message: "Invalid or expired token".to_string(),
            });
        }
        Ok(())
    }

    async fn reset_password(&self, _email: &str, token: &str, _password: &str) -> Result<()> {
        self.record("reset_password")?;
        assert_eq!(token, RESET_TOKEN);
        Ok(())
    }

    async fn fetch_profile(&self, bearer: &str) -> Result<User> {
        self.record("fetch_profile")?;
        self.check_bearer(bearer)?;
        Ok(self.profile.lock().clone())
    }

    async fn update_profile(&self, bearer: &str, update: &UserUpdate) -> Result<User> {
        self.record("update_profile")?;
        self.check_bearer(bearer)?;
        let mut profile = self.profile.lock();
        if let Some(first_name) = &update.first_name {
            profile.first_name = first_name.clone();
        }
        if let Some(last_name) = &update.last_name {
            profile.last_name = last_name.clone();
        }
        profile.recompute_full_name();
        Ok(profile.clone())
    }

    async fn list_users(&self, bearer: &str) -> Result<Vec<User>> {
        self.record("list_users")?;
        self.check_bearer(bearer)?;
        Ok(self.users.clone())
    }
}
