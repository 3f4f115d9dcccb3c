//! Configuration checks.
//!
//! [`run_checks`] inspects a [`Settings`] value and reports anything that
//! would make the account routes misbehave. The `check` management command
//! prints these messages and fails on errors.

use crate::settings::Settings;

/// Severity level for a check message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CheckLevel {
    /// Informational message.
    Info = 1,
    /// A potential problem.
    Warning = 2,
    /// A definite problem that should be fixed.
    Error = 3,
}

impl std::fmt::Display for CheckLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// A diagnostic message produced by a configuration check.
#[derive(Debug, Clone)]
pub struct CheckMessage {
    /// The severity level.
    pub level: CheckLevel,
    /// The human-readable message describing the issue.
    pub msg: String,
    /// An optional hint on how to fix the issue.
    pub hint: Option<String>,
    /// A unique identifier for this check message (e.g. "userware.E001").
    pub id: String,
}

impl CheckMessage {
    /// Creates a new `CheckMessage`.
    pub fn new(level: CheckLevel, msg: impl Into<String>, hint: Option<&str>, id: &str) -> Self {
        Self {
            level,
            msg: msg.into(),
            hint: hint.map(String::from),
            id: id.to_string(),
        }
    }

    /// Returns `true` if this message is at error level.
    pub fn is_serious(&self) -> bool {
        self.level >= CheckLevel::Error
    }
}

impl std::fmt::Display for CheckMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: ({}) {}", self.level, self.id, self.msg)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n\tHINT: {hint}")?;
        }
        Ok(())
    }
}

/// Runs all configuration checks against `settings`.
pub fn run_checks(settings: &Settings) -> Vec<CheckMessage> {
    let mut messages = Vec::new();
    let rules = &settings.userware;

    if settings.secret_key.is_empty() {
        messages.push(CheckMessage::new(
            CheckLevel::Error,
            "The secret_key setting must not be empty.",
            Some("Set USERWARE_SECRET_KEY or secret_key in the settings file."),
            "userware.E001",
        ));
    }

    if rules.password_min_length == 0 {
        messages.push(CheckMessage::new(
            CheckLevel::Error,
            "password_min_length must be at least 1.",
            None,
            "userware.E002",
        ));
    }

    if rules.username_min_length == 0 {
        messages.push(CheckMessage::new(
            CheckLevel::Error,
            "username_min_length must be at least 1.",
            None,
            "userware.E003",
        ));
    }

    if rules.switched_user_key.is_empty() || rules.switched_user_key.starts_with('_') {
        messages.push(CheckMessage::new(
            CheckLevel::Error,
            "switched_user_key must be a non-empty key that does not start with '_'.",
            Some("Keys starting with '_' are reserved for the session auth data."),
            "userware.E004",
        ));
    }

    if !settings.mount_prefix.starts_with('/') || !settings.mount_prefix.ends_with('/') {
        messages.push(CheckMessage::new(
            CheckLevel::Error,
            format!("mount_prefix '{}' must start and end with '/'.", settings.mount_prefix),
            None,
            "userware.E005",
        ));
    }

    if !settings.debug && settings.allowed_hosts.is_empty() {
        messages.push(CheckMessage::new(
            CheckLevel::Error,
            "allowed_hosts must be set when debug is false.",
            Some("Reset links are built from the request host; list the hosts you serve."),
            "userware.E006",
        ));
    }

    if !settings.debug && !settings.session_cookie_secure {
        messages.push(CheckMessage::new(
            CheckLevel::Warning,
            "session_cookie_secure is false outside debug mode.",
            Some("Serve over HTTPS and set session_cookie_secure = true."),
            "userware.W001",
        ));
    }

    if rules.register_db_session_admin && !settings.uses_db_sessions() {
        messages.push(CheckMessage::new(
            CheckLevel::Info,
            "register_db_session_admin is set but the session engine is not database-backed.",
            None,
            "userware.I001",
        ));
    }

    messages
}
