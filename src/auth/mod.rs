//! HTTP side of authentication: token cookies, the auth gate extractor, and
//! the mapping from session errors to responses.

mod cookie;
mod errors;
mod extractors;
mod state;
mod types;

pub use cookie::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, clear_cookie, get_cookie, token_cookie,
};
pub use extractors::{Auth, access_token_from_headers};
pub use state::HasAuthBackend;
pub use types::AuthenticatedAccount;
