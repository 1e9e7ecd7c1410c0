mod error;
mod response;
mod tokens;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtConfig;

pub use error::ApiError;
pub use response::{AccountResponse, ApiResponse};
pub use tokens::TokensState;
pub use users::UsersState;

/// Create the API router. Session and account routes share the `/users` prefix.
pub fn create_api_router(db: Database, jwt: Arc<JwtConfig>, secure_cookies: bool) -> Router {
    let tokens_state = tokens::TokensState {
        db: db.clone(),
        jwt: jwt.clone(),
        secure_cookies,
    };

    let users_state = users::UsersState { db, jwt };

    Router::new().nest(
        "/users",
        users::router(users_state).merge(tokens::router(tokens_state)),
    )
}
