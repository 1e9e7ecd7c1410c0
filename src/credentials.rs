//! Password hashing and credential verification.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::db::{Account, UserStore};
use crate::session::AuthError;

/// Errors from the password hashing primitive itself (not a mismatch).
#[derive(Debug)]
pub enum HashError {
    /// Hashing failed
    Hash(argon2::password_hash::Error),
    /// The stored hash is not a valid PHC string
    MalformedHash(argon2::password_hash::Error),
}

impl std::fmt::Display for HashError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashError::Hash(e) => write!(f, "Failed to hash password: {}", e),
            HashError::MalformedHash(e) => write!(f, "Stored password hash is invalid: {}", e),
        }
    }
}

impl std::error::Error for HashError {}

/// Hash a password with a fresh random salt, returning a PHC string.
pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(HashError::Hash)?;
    Ok(hash.to_string())
}

/// Compare a password against a stored PHC hash.
///
/// The comparison of the derived digest is constant-time inside `argon2`.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, HashError> {
    let parsed = PasswordHash::new(stored_hash).map_err(HashError::MalformedHash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(HashError::MalformedHash(e)),
    }
}

/// Check a username-or-email and password pair against the stored credentials.
///
/// Read-only. Returns the account without its secrets.
pub async fn verify_credentials(
    users: &UserStore,
    identifier: &str,
    secret: &str,
) -> Result<Account, AuthError> {
    let identifier = identifier.trim();

    let record = users
        .find_by_identifier(identifier)
        .await
        .map_err(AuthError::StoreUnavailable)?
        .ok_or(AuthError::NotFound)?;

    let matches = verify_password(secret, &record.password_hash).map_err(|e| {
        tracing::error!(account = %record.account.uuid, error = %e, "Password check failed");
        AuthError::InvalidCredential
    })?;

    if !matches {
        return Err(AuthError::InvalidCredential);
    }

    Ok(record.account)
}
