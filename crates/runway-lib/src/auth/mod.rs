//! Account capability consumed by the launch path
//!
//! Token acquisition (OAuth, Xbox Live exchange) lives in the host application.
//! The launch core only needs an active account and a guarantee that its token
//! is usable, which an [`AuthProvider`] supplies.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Player identity and session token used to fill game arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub nickname: String,
    pub uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Account {
    /// Token string substituted into `${auth_access_token}`; empty when offline
    pub fn token_or_empty(&self) -> &str {
        self.access_token.as_deref().unwrap_or_default()
    }
}

/// Authentication failures, reported separately from every other launch error
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Access token is invalid or expired")]
    InvalidAccessToken,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),
}

/// Source of the active account.
///
/// `validate_for_launch` may refresh the token in place and returns the
/// account to launch with.
pub trait AuthProvider: Send + Sync {
    fn active_account(&self) -> Option<Account>;

    fn validate_for_launch<'a>(
        &'a self,
        account: &'a Account,
    ) -> BoxFuture<'a, Result<Account, AuthError>>;
}

/// Provider that always hands back one fixed account; used for offline play and tests
#[derive(Debug, Clone)]
pub struct StaticAuthProvider {
    account: Option<Account>,
}

impl StaticAuthProvider {
    pub fn new(account: Option<Account>) -> Self {
        Self { account }
    }
}

impl AuthProvider for StaticAuthProvider {
    fn active_account(&self) -> Option<Account> {
        self.account.clone()
    }

    fn validate_for_launch<'a>(
        &'a self,
        account: &'a Account,
    ) -> BoxFuture<'a, Result<Account, AuthError>> {
        Box::pin(async move { Ok(account.clone()) })
    }
}
