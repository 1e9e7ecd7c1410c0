//! Session endpoints.
//!
//! - POST `/login` - Verify credentials, issue access + refresh tokens
//! - POST `/refresh-token` - Rotate the refresh token, issue a new pair
//! - POST `/logout` - Empty the refresh slot and clear both cookies

use axum::{
    Json, Router,
    body::Body,
    extract::{Request, State},
    http::{HeaderName, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use super::response::{AccountResponse, ApiResponse};
use crate::auth::{
    ACCESS_COOKIE_NAME, Auth, HasAuthBackend, REFRESH_COOKIE_NAME, clear_cookie, get_cookie,
    token_cookie,
};
use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::jwt::{JwtConfig, TokenPair};
use crate::session::IssuedSession;

/// Upper bound for a refresh request body.
const REFRESH_BODY_LIMIT: usize = 16 * 1024;

#[derive(Clone)]
pub struct TokensState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
}

impl_has_auth_backend!(TokensState);

pub fn router(state: TokensState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .route("/logout", post(logout))
        .with_state(state)
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    user: AccountResponse,
    access_token: String,
    refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    refresh_token: String,
}

fn token_cookies(tokens: &TokenPair, secure: bool) -> AppendHeaders<[(HeaderName, String); 2]> {
    AppendHeaders([
        (
            SET_COOKIE,
            token_cookie(
                ACCESS_COOKIE_NAME,
                &tokens.access.token,
                tokens.access.duration,
                secure,
            ),
        ),
        (
            SET_COOKIE,
            token_cookie(
                REFRESH_COOKIE_NAME,
                &tokens.refresh.token,
                tokens.refresh.duration,
                secure,
            ),
        ),
    ])
}

async fn login(
    State(state): State<TokensState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identifier = [payload.username.as_deref(), payload.email.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("username or email is required"))?;

    let password = payload
        .password
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("password is required"))?;

    let IssuedSession { account, tokens } = state.sessions().login(identifier, password).await?;

    tracing::info!(account = %account.uuid, "User logged in");

    Ok((
        token_cookies(&tokens, state.secure_cookies),
        ApiResponse::ok(
            LoginResponse {
                user: account.into(),
                access_token: tokens.access.token,
                refresh_token: tokens.refresh.token,
            },
            "User logged in successfully",
        ),
    ))
}

/// Rotate the refresh token. The cookie is preferred; a JSON body with
/// `refreshToken` is accepted for clients that cannot hold cookies.
async fn refresh_token(
    State(state): State<TokensState>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let (parts, body) = request.into_parts();

    let cookie_token = get_cookie(&parts.headers, REFRESH_COOKIE_NAME)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let presented = match cookie_token {
        Some(token) => Some(token),
        None => read_refresh_body(body).await?.refresh_token,
    };

    let IssuedSession { tokens, .. } = state.sessions().rotate(presented.as_deref()).await?;

    Ok((
        token_cookies(&tokens, state.secure_cookies),
        ApiResponse::ok(
            RefreshResponse {
                access_token: tokens.access.token,
                refresh_token: tokens.refresh.token,
            },
            "Access token refreshed",
        ),
    ))
}

async fn read_refresh_body(body: Body) -> Result<RefreshRequest, ApiError> {
    let bytes = axum::body::to_bytes(body, REFRESH_BODY_LIMIT)
        .await
        .map_err(|_| ApiError::bad_request("Request body too large"))?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(RefreshRequest::default());
    }

    serde_json::from_slice(&bytes).map_err(|_| ApiError::bad_request("Invalid request body"))
}

async fn logout(
    State(state): State<TokensState>,
    Auth(auth): Auth,
) -> Result<impl IntoResponse, ApiError> {
    state.sessions().logout(&auth.account).await?;

    tracing::info!(account = %auth.account.uuid, "User logged out");

    Ok((
        AppendHeaders([
            (
                SET_COOKIE,
                clear_cookie(ACCESS_COOKIE_NAME, state.secure_cookies),
            ),
            (
                SET_COOKIE,
                clear_cookie(REFRESH_COOKIE_NAME, state.secure_cookies),
            ),
        ]),
        ApiResponse::ok(serde_json::json!({}), "User logged out"),
    ))
}
