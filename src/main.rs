use std::net::SocketAddr;

use clap::Parser;
use reelhub::cli::{
    Args, build_config, init_logging, load_token_settings, open_database, parse_cors_origin,
    scrub_secret_env,
};
use reelhub::create_app;
use tracing::{error, info};

fn main() {
    let args = Args::parse();
    scrub_secret_env();

    init_logging(&args.log_format);

    let Some(tokens) = load_token_settings(&args) else {
        std::process::exit(1);
    };

    let Ok(cors_origin) = parse_cors_origin(args.cors_origin.as_deref()) else {
        std::process::exit(1);
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            error!(error = %e, "Failed to start runtime");
            std::process::exit(1);
        });

    runtime.block_on(serve(args, tokens, cors_origin));
}

async fn serve(
    args: Args,
    tokens: reelhub::jwt::TokenSettings,
    cors_origin: Option<axum::http::HeaderValue>,
) {
    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, "Failed to read listener address");
            std::process::exit(1);
        }
    };

    let config = build_config(db, tokens, args.insecure_cookies, cors_origin);
    let app = create_app(&config);

    info!(address = %local_addr, "Listening");

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
