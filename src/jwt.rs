//! Access and refresh token issuing and validation.
//!
//! Access and refresh tokens are signed with separate secrets so a leaked key
//! for one kind cannot be used to forge the other.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::db::Account;

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token - stateless, never stored
    Access,
    /// Long-lived refresh token - held in the account's single refresh slot
    Refresh,
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (account UUID)
    pub sub: String,
    pub username: String,
    pub email: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// JWT claims for refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// JWT ID, keeps two tokens minted within the same second distinct
    pub jti: String,
    /// Subject (account UUID)
    pub sub: String,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    pub iat: u64,
    pub exp: u64,
}

/// Secrets and lifetimes for both token kinds.
#[derive(Clone)]
pub struct TokenSettings {
    pub access_secret: Vec<u8>,
    pub refresh_secret: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Signing and verification keys for access and refresh tokens.
#[derive(Clone)]
pub struct JwtConfig {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: u64,
    refresh_ttl: u64,
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct SignedToken {
    /// The JWT token string
    pub token: String,
    pub issued_at: u64,
    pub expires_at: u64,
    /// Token duration in seconds (cookie Max-Age)
    pub duration: u64,
}

/// An access/refresh pair minted for one account.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: SignedToken,
    pub refresh: SignedToken,
}

fn now_secs() -> Result<u64, JwtError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| JwtError::TimeError)?
        .as_secs())
}

impl JwtConfig {
    pub fn new(settings: &TokenSettings) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(&settings.access_secret),
            access_decoding: DecodingKey::from_secret(&settings.access_secret),
            refresh_encoding: EncodingKey::from_secret(&settings.refresh_secret),
            refresh_decoding: DecodingKey::from_secret(&settings.refresh_secret),
            access_ttl: settings.access_ttl.as_secs(),
            refresh_ttl: settings.refresh_ttl.as_secs(),
        }
    }

    /// Mint an access and a refresh token for the account.
    ///
    /// The refresh token only becomes usable for rotation once the caller has
    /// stored it in the account's refresh slot.
    pub fn issue_pair(&self, account: &Account) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access: self.generate_access_token(account)?,
            refresh: self.generate_refresh_token(&account.uuid)?,
        })
    }

    /// Generate a stateless access token carrying the account's identifier fields.
    pub fn generate_access_token(&self, account: &Account) -> Result<SignedToken, JwtError> {
        let now = now_secs()?;
        let exp = now + self.access_ttl;

        let claims = AccessClaims {
            sub: account.uuid.clone(),
            username: account.username.clone(),
            email: account.email.clone(),
            full_name: account.full_name.clone(),
            token_type: TokenType::Access,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(JwtError::Encoding)?;

        Ok(SignedToken {
            token,
            issued_at: now,
            expires_at: exp,
            duration: self.access_ttl,
        })
    }

    /// Generate a refresh token for the account with the given UUID.
    pub fn generate_refresh_token(&self, account_uuid: &str) -> Result<SignedToken, JwtError> {
        let now = now_secs()?;
        let exp = now + self.refresh_ttl;

        let claims = RefreshClaims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: account_uuid.to_string(),
            token_type: TokenType::Refresh,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(JwtError::Encoding)?;

        Ok(SignedToken {
            token,
            issued_at: now,
            expires_at: exp,
            duration: self.refresh_ttl,
        })
    }

    /// Validate signature and expiry of an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let token_data = jsonwebtoken::decode::<AccessClaims>(
            token,
            &self.access_decoding,
            &strict_validation(),
        )
        .map_err(JwtError::Decoding)?;

        if token_data.claims.token_type != TokenType::Access {
            return Err(JwtError::WrongTokenType);
        }

        Ok(token_data.claims)
    }

    /// Validate signature and expiry of a refresh token.
    ///
    /// This says nothing about whether the token is still the current one for
    /// its account; that is decided against the store.
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        let token_data = jsonwebtoken::decode::<RefreshClaims>(
            token,
            &self.refresh_decoding,
            &strict_validation(),
        )
        .map_err(JwtError::Decoding)?;

        if token_data.claims.token_type != TokenType::Refresh {
            return Err(JwtError::WrongTokenType);
        }

        Ok(token_data.claims)
    }
}

fn strict_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Error decoding the token (malformed, bad signature, expired)
    Decoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
    /// Wrong token type (e.g., using refresh token as access token)
    WrongTokenType,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
            JwtError::WrongTokenType => write!(f, "Wrong token type"),
        }
    }
}

impl std::error::Error for JwtError {}
