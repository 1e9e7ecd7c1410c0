//! Tests for the login, refresh rotation, logout and access-check flows.
//!
//! Tests cover:
//! - Login response body and cookies
//! - Refresh rotation via cookie and via JSON body
//! - Superseded and replayed refresh tokens
//! - Logout revoking the refresh token
//! - Access token lookup order (cookie before Bearer header)
//! - Expired access tokens

mod common;

use axum::http::{StatusCode, header};
use common::*;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_login_sets_cookies_and_returns_tokens() {
    let (app, _db) = create_test_app().await;
    register(&app, "alice", "alice@example.com").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/login",
            json!({ "username": "alice", "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    for cookie in &cookies {
        assert!(cookie.contains("HttpOnly"), "cookie not HttpOnly: {}", cookie);
        assert!(cookie.contains("SameSite=Strict"));
        // Test app runs with insecure cookies
        assert!(!cookie.contains("Secure"));
    }
    let access_cookie = cookie_value(&cookies, "accessToken").unwrap();
    let refresh_cookie = cookie_value(&cookies, "refreshToken").unwrap();

    let json = body_json(response).await;
    assert_eq!(json["statusCode"], 200);
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "User logged in successfully");
    assert_eq!(json["data"]["user"]["username"], "alice");
    assert_eq!(json["data"]["user"]["email"], "alice@example.com");
    assert!(json["data"]["user"].get("password").is_none());
    assert!(json["data"]["user"].get("refreshToken").is_none());
    assert_eq!(json["data"]["accessToken"], access_cookie.as_str());
    assert_eq!(json["data"]["refreshToken"], refresh_cookie.as_str());
}

#[tokio::test]
async fn test_login_with_email() {
    let (app, _db) = create_test_app().await;
    register(&app, "alice", "alice@example.com").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/login",
            json!({ "username": "", "email": "ALICE@example.com", "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_unknown_user_is_not_found() {
    let (app, _db) = create_test_app().await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/login",
            json!({ "username": "nobody", "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(set_cookies(&response).is_empty());

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["statusCode"], 404);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let (app, _db) = create_test_app().await;
    register(&app, "alice", "alice@example.com").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/login",
            json!({ "username": "alice", "password": "not the password" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
    assert_eq!(body_json(response).await["message"], "Invalid user credentials");
}

#[tokio::test]
async fn test_login_missing_fields() {
    let (app, _db) = create_test_app().await;

    let response = send(
        &app,
        json_request("POST", "/api/v1/users/login", json!({ "password": PASSWORD })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        json_request("POST", "/api/v1/users/login", json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_second_login_supersedes_first() {
    let (app, _db) = create_test_app().await;
    let first = register_and_login(&app, "alice").await;
    let second = login(&app, "alice").await;
    assert_ne!(first.refresh_token, second.refresh_token);

    let (status, _) = refresh(&app, &first.refresh_token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = refresh(&app, &second.refresh_token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_with_cookie_rotates_tokens() {
    let (app, _db) = create_test_app().await;
    let session = register_and_login(&app, "alice").await;

    let response = send(
        &app,
        cookie_request("POST", "/api/v1/users/refresh-token", &session.refresh_cookie()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    let new_refresh = cookie_value(&cookies, "refreshToken").unwrap();
    assert_ne!(new_refresh, session.refresh_token);
    assert!(cookie_value(&cookies, "accessToken").is_some());

    let json = body_json(response).await;
    assert_eq!(json["message"], "Access token refreshed");
    assert_eq!(json["data"]["refreshToken"], new_refresh.as_str());
}

#[tokio::test]
async fn test_refresh_with_body() {
    let (app, _db) = create_test_app().await;
    let session = register_and_login(&app, "alice").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users/refresh-token",
            json!({ "refreshToken": session.refresh_token }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_replay_is_rejected() {
    let (app, _db) = create_test_app().await;
    let session = register_and_login(&app, "alice").await;

    let (status, rotated) = refresh(&app, &session.refresh_token).await;
    assert_eq!(status, StatusCode::OK);
    let rotated = rotated.unwrap();

    // The consumed token no longer works, and using it does not disturb the new one
    let response = send(
        &app,
        cookie_request("POST", "/api/v1/users/refresh-token", &session.refresh_cookie()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
    assert_eq!(body_json(response).await["message"], "Invalid or expired token");

    let (status, _) = refresh(&app, &rotated.refresh_token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_without_token() {
    let (app, _db) = create_test_app().await;

    let response = send(
        &app,
        json_request("POST", "/api/v1/users/refresh-token", json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Unauthorized request");
}

#[tokio::test]
async fn test_refresh_rejects_access_token_and_garbage() {
    let (app, _db) = create_test_app().await;
    let session = register_and_login(&app, "alice").await;

    let (status, _) = refresh(&app, &session.access_token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = refresh(&app, "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_concurrent_refresh_has_one_winner() {
    let (app, _db) = create_test_app().await;
    let session = register_and_login(&app, "alice").await;

    let attempts = (0..5).map(|_| refresh(&app, &session.refresh_token));
    let results = futures::future::join_all(attempts).await;

    let winners = results
        .iter()
        .filter(|(status, _)| *status == StatusCode::OK)
        .count();
    assert_eq!(winners, 1);
    assert!(
        results
            .iter()
            .all(|(status, _)| *status == StatusCode::OK || *status == StatusCode::UNAUTHORIZED)
    );
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let (app, _db) = create_test_app().await;
    let session = register_and_login(&app, "alice").await;

    let response = send(
        &app,
        cookie_request("POST", "/api/v1/users/logout", &session.access_cookie()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    assert_eq!(body_json(response).await["message"], "User logged out");

    let (status, _) = refresh(&app, &session.refresh_token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_requires_authentication() {
    let (app, _db) = create_test_app().await;

    let response = send(
        &app,
        json_request("POST", "/api/v1/users/logout", json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_access_token_still_valid_after_logout() {
    let (app, _db) = create_test_app().await;
    let session = register_and_login(&app, "alice").await;

    let response = send(
        &app,
        bearer_request("POST", "/api/v1/users/logout", &session.access_token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        bearer_request("GET", "/api/v1/users/current-user", &session.access_token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_bearer_header_is_accepted() {
    let (app, _db) = create_test_app().await;
    let session = register_and_login(&app, "alice").await;

    let response = send(
        &app,
        bearer_request("GET", "/api/v1/users/current-user", &session.access_token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["username"], "alice");
}

#[tokio::test]
async fn test_cookie_wins_over_bearer_header() {
    let (app, _db) = create_test_app().await;
    let alice = register_and_login(&app, "alice").await;
    let bob = register_and_login(&app, "bob").await;

    let mut request = cookie_request("GET", "/api/v1/users/current-user", &alice.access_cookie());
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", bob.access_token).parse().unwrap(),
    );

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["username"], "alice");
}

#[tokio::test]
async fn test_invalid_cookie_does_not_fall_back_to_header() {
    let (app, _db) = create_test_app().await;
    let session = register_and_login(&app, "alice").await;

    let mut request = cookie_request("GET", "/api/v1/users/current-user", "accessToken=forged");
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", session.access_token).parse().unwrap(),
    );

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let (app, _db) = create_test_app().await;
    let session = register_and_login(&app, "alice").await;

    let response = send(
        &app,
        bearer_request("GET", "/api/v1/users/current-user", &session.refresh_token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Invalid or expired token");
}

#[tokio::test]
async fn test_expired_access_token_is_rejected_and_refresh_recovers() {
    let (app, _db) =
        create_test_app_with_ttl(Duration::from_secs(1), Duration::from_secs(60)).await;
    let session = register_and_login(&app, "alice").await;

    tokio::time::sleep(Duration::from_millis(2100)).await;

    let response = send(
        &app,
        cookie_request("GET", "/api/v1/users/current-user", &session.access_cookie()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, rotated) = refresh(&app, &session.refresh_token).await;
    assert_eq!(status, StatusCode::OK);

    let response = send(
        &app,
        cookie_request(
            "GET",
            "/api/v1/users/current-user",
            &rotated.unwrap().access_cookie(),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_deleted_account_token_is_rejected() {
    let (app, db) = create_test_app().await;
    let session = register_and_login(&app, "alice").await;

    let account = db
        .users()
        .find_by_identifier("alice")
        .await
        .unwrap()
        .unwrap();
    db.users().delete(account.account.id).await.unwrap();

    let response = send(
        &app,
        cookie_request("GET", "/api/v1/users/current-user", &session.access_cookie()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, _) = refresh(&app, &session.refresh_token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
