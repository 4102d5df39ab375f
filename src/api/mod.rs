//! REST API boundary
//!
//! [`AuthApi`] is the seam between the session flows and the dashboard's REST
//! API. [`ApiClient`] is the HTTP implementation; tests substitute their own.

mod client;
pub mod models;

pub use client::ApiClient;
pub use models::{ApiResponse, LoginRequest, LoginResponse};

use crate::error::Result;
use crate::session::{User, UserUpdate};
use std::future::Future;

/// Calls the session flows make against the API
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login`
    fn login(&self, request: &LoginRequest) -> impl Future<Output = Result<LoginResponse>> + Send;

    /// `POST /auth/forgot-password`: email a reset token
    fn request_password_reset(&self, email: &str) -> impl Future<Output = Result<()>> + Send;

    /// `POST /auth/verify-reset-token`
    fn verify_reset_token(&self, email: &str, token: &str)
        -> impl Future<Output = Result<()>> + Send;

    /// `POST /auth/reset-password`
    fn reset_password(
        &self,
        email: &str,
        token: &str,
        password: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// `GET /users/me`
    fn fetch_profile(&self, bearer: &str) -> impl Future<Output = Result<User>> + Send;

    /// `PATCH /users/me`
    fn update_profile(
        &self,
        bearer: &str,
        update: &UserUpdate,
    ) -> impl Future<Output = Result<User>> + Send;

    /// `GET /users`
    fn list_users(&self, bearer: &str) -> impl Future<Output = Result<Vec<User>>> + Send;
}

impl<T: AuthApi + ?Sized> AuthApi for &T {
    fn login(&self, request: &LoginRequest) -> impl Future<Output = Result<LoginResponse>> + Send {
        (**self).login(request)
    }

    fn request_password_reset(&self, email: &str) -> impl Future<Output = Result<()>> + Send {
        (**self).request_password_reset(email)
    }

    fn verify_reset_token(
        &self,
        email: &str,
        token: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).verify_reset_token(email, token)
    }

    fn reset_password(
        &self,
        email: &str,
        token: &str,
        password: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).reset_password(email, token, password)
    }

    fn fetch_profile(&self, bearer: &str) -> impl Future<Output = Result<User>> + Send {
        (**self).fetch_profile(bearer)
    }

    fn update_profile(
        &self,
        bearer: &str,
        update: &UserUpdate,
    ) -> impl Future<Output = Result<User>> + Send {
        (**self).update_profile(bearer, update)
    }

    fn list_users(&self, bearer: &str) -> impl Future<Output = Result<Vec<User>>> + Send {
        (**self).list_users(bearer)
    }
}
