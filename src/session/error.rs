//! Failure kinds of the session core.

use crate::jwt::JwtError;

/// Every way a login, rotation, logout, or authorization can fail.
///
/// Each failure is final for the request; nothing here is retried.
#[derive(Debug)]
pub enum AuthError {
    /// No account matches the identifier
    NotFound,
    /// The secret does not match the stored hash
    InvalidCredential,
    /// No access token was presented to the gate
    Unauthenticated,
    /// No refresh token was presented for rotation
    MissingToken,
    /// Malformed, forged, expired, or pointing at a deleted account
    InvalidToken,
    /// Signature checks out but the slot holds a different value
    ExpiredOrSupersededToken,
    /// Token could not be signed
    SigningError(JwtError),
    /// The account store failed
    StoreUnavailable(sqlx::Error),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::NotFound => write!(f, "Account not found"),
            AuthError::InvalidCredential => write!(f, "Invalid credentials"),
            AuthError::Unauthenticated => write!(f, "No access token presented"),
            AuthError::MissingToken => write!(f, "No refresh token presented"),
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::ExpiredOrSupersededToken => {
                write!(f, "Refresh token is expired or has been superseded")
            }
            AuthError::SigningError(e) => write!(f, "Failed to sign token: {}", e),
            AuthError::StoreUnavailable(e) => write!(f, "Account store error: {}", e),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::SigningError(e) => Some(e),
            AuthError::StoreUnavailable(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::StoreUnavailable(e)
    }
}
