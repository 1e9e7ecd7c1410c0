pub mod api;
pub mod auth;
pub mod cli;
pub mod credentials;
pub mod db;
pub mod jwt;
pub mod session;

use api::create_api_router;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
};
use db::Database;
use jwt::{JwtConfig, TokenSettings};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

/// Prefix all API routes are mounted under.
pub const API_PREFIX: &str = "/api/v1";

/// Maximum accepted request body size.
const BODY_LIMIT: usize = 16 * 1024;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Signing secrets and lifetimes for access and refresh tokens
    pub tokens: TokenSettings,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Browser origin allowed to call the API with credentials
    pub cors_origin: Option<HeaderValue>,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(&config.tokens));

    let api_router = create_api_router(config.db.clone(), jwt, config.secure_cookies);

    let app = Router::new()
        .nest(API_PREFIX, api_router)
        .layer(DefaultBodyLimit::max(BODY_LIMIT));

    match &config.cors_origin {
        Some(origin) => app.layer(
            CorsLayer::new()
                .allow_origin(origin.clone())
                .allow_credentials(true)
                .allow_methods([Method::GET, Method::POST, Method::PATCH])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        ),
        None => app,
    }
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
