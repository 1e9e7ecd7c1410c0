//! Account endpoints.
//!
//! - POST `/register` - Create an account
//! - GET `/current-user` - The signed-in account
//! - PATCH `/update-account` - Change full name and email
//! - POST `/change-password` - Replace the password after checking the old one

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

use super::error::{ApiError, ResultExt, required_field};
use super::response::{AccountResponse, ApiResponse};
use crate::auth::Auth;
use crate::credentials::{hash_password, verify_password};
use crate::db::{Database, NewAccount};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

const MAX_USERNAME_LEN: usize = 32;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(UsersState);

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/current-user", get(current_user))
        .route("/update-account", patch(update_account))
        .route("/change-password", post(change_password))
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAccountRequest {
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    #[serde(default)]
    old_password: Option<String>,
    #[serde(default)]
    new_password: Option<String>,
}

fn validate_username(username: &str) -> Result<String, ApiError> {
    if username.len() > MAX_USERNAME_LEN {
        return Err(ApiError::bad_request(format!(
            "username cannot be longer than {} characters",
            MAX_USERNAME_LEN
        )));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::bad_request(
            "username can only contain letters, numbers, and underscores",
        ));
    }

    Ok(username.to_ascii_lowercase())
}

fn validate_email(email: &str) -> Result<String, ApiError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(ApiError::bad_request("email is not valid"));
    }
    Ok(email.to_lowercase())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

async fn register(
    State(state): State<UsersState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = validate_username(required_field(&payload.username, "username")?)?;
    let email = validate_email(required_field(&payload.email, "email")?)?;
    let full_name = required_field(&payload.full_name, "fullName")?;
    // Passwords are taken as given, surrounding whitespace included
    let password = payload
        .password
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("password is required"))?;
    validate_password(password)?;

    let users = state.db.users();

    let taken = users
        .is_identifier_taken(&username, &email)
        .await
        .db_err("Failed to check username availability")?;
    if taken {
        return Err(ApiError::conflict(
            "User with email or username already exists",
        ));
    }

    let password_hash = hash_password(password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ApiError::internal("Failed to create user")
    })?;

    let uuid = uuid::Uuid::new_v4().to_string();
    let id = users
        .create(&NewAccount {
            uuid: &uuid,
            username: &username,
            email: &email,
            full_name,
            password_hash: &password_hash,
        })
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::conflict("User with email or username already exists")
            } else {
                ApiError::db_error("Failed to create user", e)
            }
        })?;

    let account = users
        .get_by_id(id)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::internal("Failed to create user"))?;

    info!(account = %account.uuid, "User registered");

    Ok(ApiResponse::new(
        StatusCode::CREATED,
        AccountResponse::from(account),
        "User registered successfully",
    ))
}

async fn current_user(Auth(auth): Auth) -> impl IntoResponse {
    ApiResponse::ok(
        AccountResponse::from(auth.account),
        "Current user fetched successfully",
    )
}

async fn update_account(
    State(state): State<UsersState>,
    Auth(auth): Auth,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let full_name = required_field(&payload.full_name, "fullName")?;
    let email = validate_email(required_field(&payload.email, "email")?)?;
    let id = auth.account.id;

    let users = state.db.users();

    if users
        .is_email_taken_by_other(&email, id)
        .await
        .db_err("Failed to check email availability")?
    {
        return Err(ApiError::conflict("Email is already in use"));
    }

    let updated = users
        .update_details(id, full_name, &email)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::conflict("Email is already in use")
            } else {
                ApiError::db_error("Failed to update account", e)
            }
        })?;
    if !updated {
        return Err(ApiError::not_found("User not found"));
    }

    let account = users
        .get_by_id(id)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(ApiResponse::ok(
        AccountResponse::from(account),
        "Account details updated successfully",
    ))
}

async fn change_password(
    State(state): State<UsersState>,
    Auth(auth): Auth,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let old_password = payload
        .old_password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::bad_request("oldPassword is required"))?;
    let new_password = payload
        .new_password
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("newPassword is required"))?;
    validate_password(new_password)?;

    let users = state.db.users();
    let id = auth.account.id;

    let stored_hash = users
        .get_password_hash(id)
        .await
        .db_err("Failed to load credentials")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let matches = verify_password(old_password, &stored_hash).map_err(|e| {
        error!(account = %auth.account.uuid, error = %e, "Password check failed");
        ApiError::internal("Failed to change password")
    })?;
    if !matches {
        return Err(ApiError::bad_request("Invalid old password"));
    }

    let new_hash = hash_password(new_password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ApiError::internal("Failed to change password")
    })?;

    users
        .update_password_hash(id, &new_hash)
        .await
        .db_err("Failed to update password")?;

    info!(account = %auth.account.uuid, "Password changed");

    Ok(ApiResponse::ok(
        serde_json::json!({}),
        "Password changed successfully",
    ))
}
