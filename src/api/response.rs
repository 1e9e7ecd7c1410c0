//! Success envelope and public account representation.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::db::Account;

/// `{statusCode, data, message, success}` envelope for successful responses.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip)]
    status: StatusCode,
    status_code: u16,
    data: T,
    message: &'static str,
    success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: &'static str) -> Self {
        Self {
            status,
            status_code: status.as_u16(),
            data,
            message,
            success: status.is_success(),
        }
    }

    pub fn ok(data: T, message: &'static str) -> Self {
        Self::new(StatusCode::OK, data, message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Account as returned to clients. Uses the public UUID, never the row ID.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub created_at: String,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.uuid,
            username: account.username,
            email: account.email,
            full_name: account.full_name,
            created_at: account.created_at,
        }
    }
}
