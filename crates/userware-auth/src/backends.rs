//! Authentication backends.
//!
//! [`UsernameOrEmailBackend`] accepts either identifier, resolves it through
//! the [`resolver`](crate::resolver), and verifies the password against the
//! stored hash. An unknown identifier and a wrong password give the same
//! answer.

use std::sync::Arc;

use async_trait::async_trait;

use userware_core::UserwareResult;

use crate::account::Account;
use crate::directory::UserDirectory;
use crate::resolver;

/// A pluggable authentication strategy.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// The name recorded in the session alongside the account id.
    fn name(&self) -> &str;

    /// Returns the account matching the credentials, or `None`.
    ///
    /// The active flag is not checked here; callers decide how to treat
    /// inactive accounts.
    async fn authenticate(&self, identifier: &str, password: &str) -> Option<Account>;

    /// Fetches an account by id for an existing session.
    async fn get_user(&self, id: u64) -> UserwareResult<Option<Account>>;
}

/// Authenticates with a username or an email address.
#[derive(Clone)]
pub struct UsernameOrEmailBackend {
    directory: Arc<dyn UserDirectory>,
}

impl std::fmt::Debug for UsernameOrEmailBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsernameOrEmailBackend").finish_non_exhaustive()
    }
}

impl UsernameOrEmailBackend {
    /// The name stored in sessions created by this backend.
    pub const NAME: &'static str = "userware.auth.UsernameOrEmailBackend";

    /// Creates a backend over `directory`.
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl AuthBackend for UsernameOrEmailBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn authenticate(&self, identifier: &str, password: &str) -> Option<Account> {
        let account = resolver::resolve(self.directory.as_ref(), identifier).await?;
        if account.check_password(password).await {
            Some(account)
        } else {
            None
        }
    }

    async fn get_user(&self, id: u64) -> UserwareResult<Option<Account>> {
        self.directory.get_by_id(id).await
    }
}
