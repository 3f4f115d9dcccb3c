//! Settings for userware.
//!
//! [`Settings`] holds the server, session and redirect configuration, and
//! [`UserwareSettings`] the account rules (minimum lengths, reserved names,
//! the impersonation session key). Settings are loaded once at startup by
//! [`settings_loader`](crate::settings_loader) and passed explicitly; there is
//! no process-wide settings instance.

use serde::{Deserialize, Serialize};

use crate::checks::{self, CheckMessage};

/// Account rules applied by the userware forms and views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserwareSettings {
    /// Minimum accepted password length.
    pub password_min_length: usize,
    /// Minimum accepted username length.
    pub username_min_length: usize,
    /// Usernames that can never be registered (compared case-insensitively).
    pub reserved_usernames: Vec<String>,
    /// Session key holding the identifier of the impersonated account.
    pub switched_user_key: String,
    /// Whether the user admin descriptor is registered at startup.
    pub register_admin: bool,
    /// Whether the session admin descriptor is registered at startup.
    ///
    /// Only honoured when the session engine is database-backed.
    pub register_db_session_admin: bool,
}

impl Default for UserwareSettings {
    fn default() -> Self {
        Self {
            password_min_length: 6,
            username_min_length: 3,
            reserved_usernames: [
                "about", "account", "accounts", "admin", "administrator", "api", "help",
                "login", "logout", "mail", "password", "register", "root", "settings",
                "signup", "staff", "support", "system", "user", "users", "userware", "www",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            switched_user_key: "userware_switched_username".to_string(),
            register_admin: true,
            register_db_session_admin: false,
        }
    }
}

impl UserwareSettings {
    /// Returns `true` if `username` is in the reserved set, ignoring case.
    pub fn is_reserved(&self, username: &str) -> bool {
        self.reserved_usernames
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(username))
    }
}

/// Top-level settings.
///
/// All fields have sensible defaults, so a settings file only needs to list
/// the values it overrides.
///
/// # Examples
///
/// ```
/// use userware_core::Settings;
///
/// let settings = Settings::default();
/// assert_eq!(settings.login_url, "/account/login/");
/// assert_eq!(settings.userware.password_min_length, 6);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled.
    pub debug: bool,
    /// The secret key used for signing reset tokens and session auth hashes.
    pub secret_key: String,
    /// Address the development server binds to.
    pub bind_address: String,
    /// Host names the server answers for. `"*"` matches any host and a
    /// leading `.` matches subdomains. See [`Settings::effective_allowed_hosts`].
    pub allowed_hosts: Vec<String>,

    // ── Logging ──────────────────────────────────────────────────────

    /// The log level filter (e.g. "info", "userware_auth=debug").
    pub log_level: String,

    // ── Routing ──────────────────────────────────────────────────────

    /// Path prefix the account routes are mounted under.
    pub mount_prefix: String,
    /// Where anonymous users are sent when a login is required.
    pub login_url: String,
    /// Where users land after login, password change and switch-on.
    pub login_redirect_url: String,
    /// Where users land after logout.
    pub logout_redirect_url: String,

    // ── Sessions ─────────────────────────────────────────────────────

    /// Session engine name. Engines containing `_db` are database-backed.
    pub session_engine: String,
    /// The session cookie name.
    pub session_cookie_name: String,
    /// Session lifetime in seconds.
    pub session_cookie_age: u64,
    /// Whether the session cookie carries the `Secure` attribute.
    pub session_cookie_secure: bool,

    // ── Password reset ───────────────────────────────────────────────

    /// Lifetime of password reset tokens in seconds.
    pub password_reset_timeout: u64,
    /// Sender address for reset notifications.
    pub default_from_email: String,

    // ── Accounts ─────────────────────────────────────────────────────

    /// Account rules.
    pub userware: UserwareSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            secret_key: String::new(),
            bind_address: "127.0.0.1:8000".to_string(),
            allowed_hosts: Vec::new(),
            log_level: "info".to_string(),
            mount_prefix: "/account/".to_string(),
            login_url: "/account/login/".to_string(),
            login_redirect_url: "/".to_string(),
            logout_redirect_url: "/".to_string(),
            session_engine: "userware.sessions.memory".to_string(),
            session_cookie_name: "sessionid".to_string(),
            session_cookie_age: 60 * 60 * 24 * 14,
            session_cookie_secure: false,
            password_reset_timeout: 60 * 60 * 24 * 3,
            default_from_email: "webmaster@localhost".to_string(),
            userware: UserwareSettings::default(),
        }
    }
}

impl Settings {
    /// Returns `true` if sessions are stored in a database-backed engine.
    pub fn uses_db_sessions(&self) -> bool {
        self.session_engine.contains("_db")
    }

    /// The host allow-list to enforce.
    ///
    /// An empty `allowed_hosts` allows only local hosts in debug mode and
    /// nothing otherwise.
    pub fn effective_allowed_hosts(&self) -> Vec<String> {
        if self.allowed_hosts.is_empty() && self.debug {
            [".localhost", "127.0.0.1", "[::1]"]
                .iter()
                .map(ToString::to_string)
                .collect()
        } else {
            self.allowed_hosts.clone()
        }
    }

    /// Runs the configuration checks and returns every problem found.
    pub fn check(&self) -> Vec<CheckMessage> {
        checks::run_checks(self)
    }
}
