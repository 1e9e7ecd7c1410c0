//! Session token lifecycle: login, refresh rotation, logout, and access checks.
//!
//! Each account has a single refresh slot. A refresh token is accepted only
//! while it is byte-for-byte the value in that slot, so issuing a new one
//! (login or rotation) revokes the old one and logout revokes all of them.
//! Access tokens are stateless and stay valid until they expire, even after
//! logout; the exposure window is bounded by the access TTL.
//!
//! Nothing here knows about HTTP. The `auth` module translates `AuthError`
//! into responses.

mod error;

pub use error::AuthError;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::credentials::verify_credentials;
use crate::db::{Account, Database, UserStore};
use crate::jwt::{JwtConfig, TokenPair};

/// Tokens handed to a client after login or rotation, with the account they belong to.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub account: Account,
    pub tokens: TokenPair,
}

/// Entry point for all session operations.
#[derive(Clone)]
pub struct SessionManager {
    users: UserStore,
    jwt: Arc<JwtConfig>,
}

impl SessionManager {
    pub fn new(db: &Database, jwt: Arc<JwtConfig>) -> Self {
        Self {
            users: db.users(),
            jwt,
        }
    }

    /// Verify credentials, then mint and store a new token pair.
    ///
    /// Replaces whatever refresh token the account held, which signs out any
    /// other session of the same account.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<IssuedSession, AuthError> {
        let account = verify_credentials(&self.users, identifier, secret).await?;

        let tokens = self
            .jwt
            .issue_pair(&account)
            .map_err(AuthError::SigningError)?;

        // Persist before the tokens leave this function
        let stored = self
            .users
            .set_refresh_token(account.id, &tokens.refresh.token)
            .await?;
        if !stored {
            // Account deleted between verification and the write
            return Err(AuthError::NotFound);
        }

        debug!(account = %account.uuid, "Issued session");
        Ok(IssuedSession { account, tokens })
    }

    /// Exchange the current refresh token for a new pair.
    ///
    /// Succeeds at most once per stored value: concurrent calls with the same
    /// token race on a conditional update and all but one get
    /// `ExpiredOrSupersededToken`. On failure the stored token is untouched.
    pub async fn rotate(&self, presented: Option<&str>) -> Result<IssuedSession, AuthError> {
        let presented = presented
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = self.jwt.validate_refresh_token(presented).map_err(|e| {
            debug!(error = %e, "Refresh token failed verification");
            AuthError::InvalidToken
        })?;

        let record = self
            .users
            .get_record_by_uuid(&claims.sub)
            .await?
            .ok_or_else(|| {
                debug!(account = %claims.sub, "Refresh token for unknown account");
                AuthError::InvalidToken
            })?;

        if record.refresh_token.as_deref() != Some(presented) {
            warn!(account = %claims.sub, "Superseded refresh token presented");
            return Err(AuthError::ExpiredOrSupersededToken);
        }

        let account = record.account;
        let tokens = self
            .jwt
            .issue_pair(&account)
            .map_err(AuthError::SigningError)?;

        let swapped = self
            .users
            .swap_refresh_token(account.id, presented, &tokens.refresh.token)
            .await?;
        if !swapped {
            warn!(account = %account.uuid, "Lost refresh rotation race");
            return Err(AuthError::ExpiredOrSupersededToken);
        }

        debug!(account = %account.uuid, "Rotated refresh token");
        Ok(IssuedSession { account, tokens })
    }

    /// Empty the account's refresh slot. Outstanding access tokens remain
    /// valid until they expire.
    pub async fn logout(&self, account: &Account) -> Result<(), AuthError> {
        self.users.clear_refresh_token(account.id).await?;
        debug!(account = %account.uuid, "Cleared refresh token");
        Ok(())
    }

    /// Resolve an access token to its account.
    ///
    /// A token whose account no longer exists is reported as `InvalidToken`,
    /// the same as a forged one.
    pub async fn authorize(&self, access_token: Option<&str>) -> Result<Account, AuthError> {
        let token = access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Unauthenticated)?;

        let claims = self.jwt.validate_access_token(token).map_err(|e| {
            debug!(error = %e, "Access token failed verification");
            AuthError::InvalidToken
        })?;

        self.users
            .get_by_uuid(&claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)
    }
}
