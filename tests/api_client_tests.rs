//! HTTP client tests against a throwaway axum server
//!
//! Run with: cargo test --test api_client_tests

use admin_session::api::{ApiClient, AuthApi, LoginRequest};
use admin_session::config::ApiConfig;
use admin_session::error::Error;
use admin_session::session::{Role, UserUpdate};
use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

const TOKEN: &str = "tok-0123456789abcdef";

fn user_json(first: &str, last: &str) -> Value {
    json!({
        "id": "u1",
        "firstName": first,
        "lastName": last,
        "fullName": format!("{} {}", first, last),
        "email": "ada@example.com",
        "role": "admin",
        "permissions": ["users:read", "users:write"],
        "isEmailVerified": true,
        "hasUpdatedPassword": true
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"success": false, "error": "Unauthorized"})),
    )
        .into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == "correct-horse" {
        Json(json!({
            "success": true,
            "data": {"token": TOKEN, "user": user_json("Ada", "Lovelace"), "expiresIn": 3600}
        }))
        .into_response()
    } else {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"success": false, "message": "Invalid email or password"})),
        )
            .into_response()
    }
}

async fn forgot_password(Json(body): Json<Value>) -> Response {
    if body["email"] == "ada@example.com" {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "message": "No account with that email"})),
        )
            .into_response()
    }
}

async fn verify_reset_token(Json(body): Json<Value>) -> Response {
    if body["token"] == "482913" {
        Json(json!({"success": true, "data": null})).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "message": "Invalid or expired token"})),
        )
            .into_response()
    }
}

async fn reset_password(Json(body): Json<Value>) -> Response {
    if body["newPassword"].as_str().map(|p| p.len() >= 8).unwrap_or(false) {
        Json(json!({"success": true, "data": null})).into_response()
    } else {
        (StatusCode::BAD_REQUEST, "password too short").into_response()
    }
}

async fn me(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({"success": true, "data": user_json("Ada", "Lovelace")})).into_response()
}

async fn update_me(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let first = body["firstName"].as_str().unwrap_or("Ada").to_string();
    let last = body["lastName"].as_str().unwrap_or("Lovelace").to_string();
    Json(json!({"success": true, "data": user_json(&first, &last)})).into_response()
}

async fn users(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "success": true,
        "data": [user_json("Ada", "Lovelace"), user_json("Grace", "Hopper")]
    }))
    .into_response()
}

/// Start the fake API on an ephemeral port and return a client for it
async fn start_fake_api() -> ApiClient {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/forgot-password", post(forgot_password))
        .route("/api/auth/verify-reset-token", post(verify_reset_token))
        .route("/api/auth/reset-password", post(reset_password))
        .route("/api/users/me", get(me).patch(update_me))
        .route("/api/users", get(users));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    ApiClient::new(&ApiConfig {
        base_url: format!("http://{}/api/", addr),
        timeout_secs: 5,
    })
    .unwrap()
}

fn credentials(password: &str) -> LoginRequest {
    LoginRequest {
        email: "ada@example.com".to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn test_login_success() {
    let client = start_fake_api().await;

    let response = client.login(&credentials("correct-horse")).await.unwrap();

    assert_eq!(response.token, TOKEN);
    assert_eq!(response.expires_in, Some(3600));
    assert_eq!(response.user.full_name, "Ada Lovelace");
    assert_eq!(response.user.role, Role::Admin);
}

#[tokio::test]
async fn test_login_failure_carries_message() {
    let client = start_fake_api().await;

    let err = client.login(&credentials("wrong")).await.unwrap_err();

    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "Invalid email or password");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_reset_endpoints() {
    let client = start_fake_api().await;

    client.request_password_reset("ada@example.com").await.unwrap();
    client
        .verify_reset_token("ada@example.com", "482913")
        .await
        .unwrap();
    client
        .reset_password("ada@example.com", "482913", "n3w-Passw0rd")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reset_errors() {
    let client = start_fake_api().await;

    let err = client
        .request_password_reset("nobody@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Api { status: 404, .. }));

    let err = client
        .verify_reset_token("ada@example.com", "000000")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "API error (400): Invalid or expired token");
}

#[tokio::test]
async fn test_non_json_error_body_uses_status_text() {
    let client = start_fake_api().await;

    let err = client
        .reset_password("ada@example.com", "482913", "short")
        .await
        .unwrap_err();

    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Bad Request");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_profile_requires_bearer() {
    let client = start_fake_api().await;

    let user = client.fetch_profile(TOKEN).await.unwrap();
    assert_eq!(user.email, "ada@example.com");

    let err = client.fetch_profile("not-the-token").await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
    assert!(err.is_auth_failure());
}

#[tokio::test]
async fn test_update_profile() {
    let client = start_fake_api().await;

    let user = client
        .update_profile(
            TOKEN,
            &UserUpdate {
                first_name: Some("Augusta".into()),
                last_name: Some("King".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(user.full_name, "Augusta King");
}

#[tokio::test]
async fn test_list_users() {
    let client = start_fake_api().await;

    let users = client.list_users(TOKEN).await.unwrap();

    assert_eq!(users.len(), 2);
    assert_eq!(users[1].first_name, "Grace");
}

#[tokio::test]
async fn test_unreachable_api_is_http_error() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(&ApiConfig {
        base_url: format!("http://{}", addr),
        timeout_secs: 2,
    })
    .unwrap();

    let err = client.login(&credentials("correct-horse")).await.unwrap_err();
    assert!(matches!(err, Error::Http(_)));
}
