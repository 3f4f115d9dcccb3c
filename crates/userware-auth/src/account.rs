//! The account record.
//!
//! An [`Account`] is owned by the [`UserDirectory`](crate::directory::UserDirectory).
//! Views and forms work on copies and write changes back through the directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use userware_core::UserwareResult;

use crate::hashers::{self, PasswordHasher};

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Directory-assigned identifier. Zero until the account is created.
    pub id: u64,
    /// Unique username, compared case-insensitively.
    pub username: String,
    /// Unique email address, compared case-insensitively.
    pub email: String,
    /// The encoded password hash. Never serialized out.
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Inactive accounts cannot log in or reset their password.
    pub is_active: bool,
    /// Staff members may impersonate other accounts.
    pub is_staff: bool,
    /// Superusers can never be impersonated.
    pub is_superuser: bool,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            id: 0,
            username: String::new(),
            email: String::new(),
            password: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            first_name: String::new(),
            last_name: String::new(),
            date_joined: Utc::now(),
            last_login: None,
        }
    }
}

impl Account {
    /// Creates an active, unsaved account with no usable password.
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    /// Hashes and stores `raw_password`.
    pub async fn set_password(
        &mut self,
        hasher: &dyn PasswordHasher,
        raw_password: &str,
    ) -> UserwareResult<()> {
        self.password = hashers::make_password(hasher, raw_password).await?;
        Ok(())
    }

    /// Returns `true` if `raw_password` matches the stored hash.
    ///
    /// A malformed hash counts as a mismatch.
    pub async fn check_password(&self, raw_password: &str) -> bool {
        match hashers::check_password(raw_password, &self.password).await {
            Ok(matches) => matches,
            Err(e) => {
                tracing::error!(account_id = self.id, error = %e, "Password verification failed");
                false
            }
        }
    }

    /// Replaces the credential with one that never matches.
    pub fn set_unusable_password(&mut self) {
        self.password = hashers::make_unusable_password();
    }

    /// Returns `true` if the account has a usable password.
    pub fn has_usable_password(&self) -> bool {
        hashers::is_password_usable(&self.password)
    }

    /// Returns "first last", trimmed.
    pub fn get_full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}
