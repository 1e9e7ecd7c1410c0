#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use reelhub::{ServerConfig, create_app, db::Database, jwt::TokenSettings};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

pub const ACCESS_SECRET: &[u8] = b"test-access-secret-that-is-long-enough";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret-that-is-long-enough";

pub const PASSWORD: &str = "correct horse battery";

pub fn token_settings(access_ttl: Duration, refresh_ttl: Duration) -> TokenSettings {
    TokenSettings {
        access_secret: ACCESS_SECRET.to_vec(),
        refresh_secret: REFRESH_SECRET.to_vec(),
        access_ttl,
        refresh_ttl,
    }
}

/// Create a test app with the given token lifetimes and return it with its database.
pub async fn create_test_app_with_ttl(
    access_ttl: Duration,
    refresh_ttl: Duration,
) -> (Router, Database) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        tokens: token_settings(access_ttl, refresh_ttl),
        secure_cookies: false,
        cors_origin: None,
    };
    (create_app(&config), db)
}

/// Create a test app with a 15 minute access token and 10 day refresh token.
pub async fn create_test_app() -> (Router, Database) {
    create_test_app_with_ttl(Duration::from_secs(15 * 60), Duration::from_secs(10 * 86400)).await
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn cookie_request(method: &str, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

pub fn bearer_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// All Set-Cookie header values on a response.
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Value of the named cookie from a list of Set-Cookie headers.
pub fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    cookies.iter().find_map(|c| {
        c.strip_prefix(&prefix)
            .map(|rest| rest.split(';').next().unwrap_or("").to_string())
    })
}

pub async fn register(app: &Router, username: &str, email: &str) -> Value {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/v1/users/register",
            json!({
                "username": username,
                "email": email,
                "fullName": "Test User",
                "password": PASSWORD,
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

/// Tokens returned by a successful login or refresh.
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
}

impl Session {
    pub fn access_cookie(&self) -> String {
        format!("accessToken={}", self.access_token)
    }

    pub fn refresh_cookie(&self) -> String {
        format!("refreshToken={}", self.refresh_token)
    }
}

pub async fn login(app: &Router, username: &str) -> Session {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/v1/users/login",
            json!({ "username": username, "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    Session {
        access_token: json["data"]["accessToken"].as_str().unwrap().to_string(),
        refresh_token: json["data"]["refreshToken"].as_str().unwrap().to_string(),
    }
}

/// Register an account and log in with it.
pub async fn register_and_login(app: &Router, username: &str) -> Session {
    register(app, username, &format!("{}@example.com", username)).await;
    login(app, username).await
}

/// Rotate using the refresh cookie. Returns the response status and, on success, the new pair.
pub async fn refresh(app: &Router, refresh_token: &str) -> (StatusCode, Option<Session>) {
    let response = send(
        app,
        cookie_request(
            "POST",
            "/api/v1/users/refresh-token",
            &format!("refreshToken={}", refresh_token),
        ),
    )
    .await;
    let status = response.status();
    if status != StatusCode::OK {
        return (status, None);
    }
    let json = body_json(response).await;
    let session = Session {
        access_token: json["data"]["accessToken"].as_str().unwrap().to_string(),
        refresh_token: json["data"]["refreshToken"].as_str().unwrap().to_string(),
    };
    (status, Some(session))
}
