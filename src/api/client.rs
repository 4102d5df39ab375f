//! reqwest implementation of the API seam

use super::models::{ApiResponse, EmailBody, LoginRequest, LoginResponse, ResetPasswordBody, VerifyTokenBody};
use super::AuthApi;
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::session::{User, UserUpdate};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// HTTP client for the dashboard REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        let builder = self.http.request(method, url);
        match bearer {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<Option<T>> {
        let response = builder.send().await?;
        decode(response).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let builder = self.request(Method::POST, path, None).json(body);
        self.send::<serde_json::Value>(builder).await.map(|_| ())
    }

    async fn required<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        self.send(builder)
            .await?
            .ok_or_else(|| Error::Other(format!("API response is missing {}", what)))
    }
}

/// Map a response to its enveloped payload or an error
async fn decode<T: DeserializeOwned>(response: Response) -> Result<Option<T>> {
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        if body.trim().is_empty() {
            return Ok(None);
        }
        let envelope: ApiResponse<T> = serde_json::from_str(&body)?;
        return Ok(envelope.data);
    }

    let message = serde_json::from_str::<ApiResponse<serde_json::Value>>(&body)
        .ok()
        .and_then(|envelope| envelope.failure_text().map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Unauthorized(message));
    }
    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

impl AuthApi for ApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let builder = self.request(Method::POST, "/auth/login", None).json(request);
        self.required(builder, "login payload").await
    }

    async fn request_password_reset(&self, email: &str) -> Result<()> {
        self.post("/auth/forgot-password", &EmailBody { email }).await
    }

    async fn verify_reset_token(&self, email: &str, token: &str) -> Result<()> {
        self.post("/auth/verify-reset-token", &VerifyTokenBody { email, token })
            .await
    }

    async fn reset_password(&self, email: &str, token: &str, password: &str) -> Result<()> {
        let body = ResetPasswordBody {
            email,
            token,
            new_password: password,
        };
        self.post("/auth/reset-password", &body).await
    }

    async fn fetch_profile(&self, bearer: &str) -> Result<User> {
        let builder = self.request(Method::GET, "/users/me", Some(bearer));
        self.required(builder, "user profile").await
    }

    async fn update_profile(&self, bearer: &str, update: &UserUpdate) -> Result<User> {
        let builder = self
            .request(Method::PATCH, "/users/me", Some(bearer))
            .json(update);
        self.required(builder, "user profile").await
    }

    async fn list_users(&self, bearer: &str) -> Result<Vec<User>> {
        let builder = self.request(Method::GET, "/users", Some(bearer));
        Ok(self.send(builder).await?.unwrap_or_default())
    }
}
