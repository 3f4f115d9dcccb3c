//! Shared application state.
//!
//! [`UserwareState`] bundles the settings and every external collaborator
//! the account views need. It is built once at startup, wrapped in an
//! `Arc`, and captured by each route handler and middleware.

use std::sync::Arc;

use userware_core::Settings;
use userware_views::{InMemorySessionBackend, SessionBackend};

use crate::admin::AdminRegistry;
use crate::backends::{AuthBackend, UsernameOrEmailBackend};
use crate::directory::{InMemoryUserDirectory, UserDirectory};
use crate::hashers::{Argon2Hasher, PasswordHasher};
use crate::notify::{LoggingNotifier, ResetNotifier};
use crate::signals::AccountSignals;
use crate::tokens::PasswordResetTokenGenerator;

/// Settings and collaborators shared by all requests.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use userware_auth::{BcryptHasher, UserwareState};
/// use userware_core::Settings;
///
/// let state = UserwareState::new(Settings::default())
///     .with_hasher(Arc::new(BcryptHasher { cost: 4 }));
/// assert_eq!(state.hasher().algorithm(), "bcrypt");
/// ```
pub struct UserwareState {
    settings: Settings,
    directory: Arc<dyn UserDirectory>,
    sessions: Arc<dyn SessionBackend>,
    hasher: Arc<dyn PasswordHasher>,
    notifier: Arc<dyn ResetNotifier>,
    signals: AccountSignals,
    admin: AdminRegistry,
}

impl std::fmt::Debug for UserwareState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserwareState")
            .field("settings", &self.settings)
            .field("hasher", &self.hasher.algorithm())
            .field("signals", &self.signals)
            .field("admin", &self.admin)
            .finish_non_exhaustive()
    }
}

impl UserwareState {
    /// Creates state with in-memory storage, Argon2 hashing and a logging
    /// notifier.
    pub fn new(settings: Settings) -> Self {
        let admin = AdminRegistry::from_settings(&settings);
        Self {
            settings,
            directory: Arc::new(InMemoryUserDirectory::new()),
            sessions: Arc::new(InMemorySessionBackend::new()),
            hasher: Arc::new(Argon2Hasher),
            notifier: Arc::new(LoggingNotifier),
            signals: AccountSignals::default(),
            admin,
        }
    }

    /// Replaces the user directory.
    #[must_use]
    pub fn with_directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = directory;
        self
    }

    /// Replaces the session store.
    #[must_use]
    pub fn with_sessions(mut self, sessions: Arc<dyn SessionBackend>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Replaces the hasher used for new passwords.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Replaces the reset notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn ResetNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn directory(&self) -> &dyn UserDirectory {
        self.directory.as_ref()
    }

    pub fn sessions(&self) -> Arc<dyn SessionBackend> {
        Arc::clone(&self.sessions)
    }

    pub fn hasher(&self) -> &dyn PasswordHasher {
        self.hasher.as_ref()
    }

    pub fn notifier(&self) -> &dyn ResetNotifier {
        self.notifier.as_ref()
    }

    /// Signals; connect receivers before serving.
    pub const fn signals(&self) -> &AccountSignals {
        &self.signals
    }

    pub const fn admin(&self) -> &AdminRegistry {
        &self.admin
    }

    /// Returns the authentication backend over the directory.
    pub fn backend(&self) -> UsernameOrEmailBackend {
        UsernameOrEmailBackend::new(Arc::clone(&self.directory))
    }

    /// Returns a token generator keyed by the secret key.
    pub fn token_generator(&self) -> PasswordResetTokenGenerator {
        PasswordResetTokenGenerator::new(
            self.settings.secret_key.clone(),
            self.settings.password_reset_timeout,
        )
    }

    /// The name recorded in sessions for the authentication backend.
    pub fn backend_name(&self) -> String {
        self.backend().name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = UserwareState::new(Settings::default());
        assert_eq!(state.hasher().algorithm(), "argon2");
        assert_eq!(state.settings().mount_prefix, "/account/");
        assert_eq!(state.backend_name(), UsernameOrEmailBackend::NAME);
        assert_eq!(state.signals().user_switched_on.receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_builders_replace_collaborators() {
        let directory = Arc::new(InMemoryUserDirectory::new());
        directory
            .create(crate::Account::new("alice", "alice@x.com"))
            .await
            .unwrap();
        let state = UserwareState::new(Settings::default()).with_directory(directory);
        assert!(state
            .directory()
            .find_by_username_iexact("alice")
            .await
            .unwrap()
            .is_some());
    }
}
