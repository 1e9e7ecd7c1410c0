//! Authentication user types.

use crate::db::Account;

/// Account resolved from a valid access token.
///
/// Carries no password hash and no refresh token.
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    pub account: Account,
}
