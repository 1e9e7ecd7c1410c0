//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::jwt::TokenSettings;
use axum::http::HeaderValue;
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};

const MIN_SECRET_LENGTH: usize = 32;

const SECRET_ENV_VARS: [&str; 2] = ["ACCESS_TOKEN_SECRET", "REFRESH_TOKEN_SECRET"];

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Clone)]
#[command(name = "reelhub", about = "Account and session service for Reelhub")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "reelhub.db")]
    pub database: String,

    /// Secret for signing access tokens. Prefer the environment variable
    #[arg(long, env = "ACCESS_TOKEN_SECRET", hide_env_values = true)]
    pub access_token_secret: String,

    /// Secret for signing refresh tokens, must differ from the access secret
    #[arg(long, env = "REFRESH_TOKEN_SECRET", hide_env_values = true)]
    pub refresh_token_secret: String,

    /// Access token lifetime, e.g. "15m" or "1d" (bare numbers are seconds)
    #[arg(long, env = "ACCESS_TOKEN_EXPIRY", value_parser = parse_ttl)]
    pub access_token_expiry: Duration,

    /// Refresh token lifetime, e.g. "10d"
    #[arg(long, env = "REFRESH_TOKEN_EXPIRY", value_parser = parse_ttl)]
    pub refresh_token_expiry: Duration,

    /// Send cookies without the Secure flag (plain HTTP development only)
    #[arg(long)]
    pub insecure_cookies: bool,

    /// Browser origin allowed to call the API with credentials
    #[arg(long, env = "CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("database", &self.database)
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .field("insecure_cookies", &self.insecure_cookies)
            .field("cors_origin", &self.cors_origin)
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
}

/// Parse a token lifetime. Accepts humantime strings ("15m", "10d") or seconds.
fn parse_ttl(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let ttl = match s.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(s).map_err(|e| format!("Invalid duration: {}", e))?,
    };

    if ttl.as_secs() == 0 {
        return Err("Duration must be at least one second".to_string());
    }

    Ok(ttl)
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Remove the token secrets from the process environment once parsed.
pub fn scrub_secret_env() {
    for name in SECRET_ENV_VARS {
        // SAFETY: Called from main before the runtime spawns any other
        // thread that could read the environment.
        unsafe { std::env::remove_var(name) };
    }
}

/// Check token secrets and lifetimes.
/// Returns None and logs an error if the configuration is unusable.
pub fn load_token_settings(args: &Args) -> Option<TokenSettings> {
    let access_secret = args.access_token_secret.trim();
    let refresh_secret = args.refresh_token_secret.trim();

    for (name, secret) in [
        ("Access", access_secret),
        ("Refresh", refresh_secret),
    ] {
        if secret.len() < MIN_SECRET_LENGTH {
            error!(
                "{} token secret is shorter than {} characters. Use a longer secret",
                name, MIN_SECRET_LENGTH
            );
            return None;
        }
    }

    if access_secret == refresh_secret {
        error!("Access and refresh token secrets must be different");
        return None;
    }

    if args.refresh_token_expiry <= args.access_token_expiry {
        error!(
            access = ?args.access_token_expiry,
            refresh = ?args.refresh_token_expiry,
            "Refresh token expiry must be longer than access token expiry"
        );
        return None;
    }

    Some(TokenSettings {
        access_secret: access_secret.as_bytes().to_vec(),
        refresh_secret: refresh_secret.as_bytes().to_vec(),
        access_ttl: args.access_token_expiry,
        refresh_ttl: args.refresh_token_expiry,
    })
}

/// Parse the CORS origin, if one was given.
/// Returns Err(()) and logs an error if it is not a valid header value.
pub fn parse_cors_origin(origin: Option<&str>) -> Result<Option<HeaderValue>, ()> {
    let Some(origin) = origin.map(str::trim).filter(|o| !o.is_empty()) else {
        return Ok(None);
    };

    match HeaderValue::from_str(origin) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            error!(origin = %origin, error = %e, "Invalid CORS origin");
            Err(())
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    tokens: TokenSettings,
    insecure_cookies: bool,
    cors_origin: Option<HeaderValue>,
) -> ServerConfig {
    ServerConfig {
        db,
        tokens,
        secure_cookies: !insecure_cookies,
        cors_origin,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
