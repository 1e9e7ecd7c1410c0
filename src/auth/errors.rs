//! Translation of session failures into HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::session::AuthError;

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::InvalidCredential
            | AuthError::Unauthenticated
            | AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::ExpiredOrSupersededToken => StatusCode::UNAUTHORIZED,
            AuthError::SigningError(_) | AuthError::StoreUnavailable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing message. Token failures share one message so a caller
    /// cannot tell a forged token from a superseded one.
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::NotFound => "User does not exist",
            AuthError::InvalidCredential => "Invalid user credentials",
            AuthError::Unauthenticated | AuthError::MissingToken => "Unauthorized request",
            AuthError::InvalidToken | AuthError::ExpiredOrSupersededToken => {
                "Invalid or expired token"
            }
            AuthError::SigningError(_) => "Failed to generate tokens",
            AuthError::StoreUnavailable(_) => "Database error",
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    status_code: u16,
    message: &'static str,
    success: bool,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Session operation failed");
        }

        (
            status,
            Json(ErrorResponse {
                status_code: status.as_u16(),
                message: self.message(),
                success: false,
            }),
        )
            .into_response()
    }
}
