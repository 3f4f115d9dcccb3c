//! Settings loading from configuration files.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file, deep-merged over the defaults.
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `USERWARE_SECRET_KEY` | `secret_key` |
//! | `USERWARE_DEBUG` | `debug` |
//! | `USERWARE_LOG_LEVEL` | `log_level` |
//! | `USERWARE_BIND_ADDRESS` | `bind_address` |
//! | `USERWARE_ALLOWED_HOSTS` | `allowed_hosts` (comma-separated) |
//! | `USERWARE_LOGIN_URL` | `login_url` |
//! | `USERWARE_LOGIN_REDIRECT_URL` | `login_redirect_url` |
//! | `USERWARE_LOGOUT_REDIRECT_URL` | `logout_redirect_url` |
//! | `USERWARE_SESSION_COOKIE_NAME` | `session_cookie_name` |
//! | `USERWARE_SESSION_COOKIE_SECURE` | `session_cookie_secure` |
//! | `USERWARE_PASSWORD_MIN_LENGTH` | `userware.password_min_length` |
//! | `USERWARE_USERNAME_MIN_LENGTH` | `userware.username_min_length` |
//! | `USERWARE_RESERVED_USERNAMES` | `userware.reserved_usernames` (comma-separated) |
//! | `USERWARE_SWITCHED_USER_KEY` | `userware.switched_user_key` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use userware_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/userware.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::UserwareError;
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// Any fields not present in the TOML keep their default values.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, UserwareError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| UserwareError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    merge_over_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, UserwareError> {
    let content = read_config(path.as_ref(), "TOML")?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, UserwareError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
pub fn from_json_str(json_str: &str) -> Result<Settings, UserwareError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| UserwareError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;

    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, UserwareError> {
    let content = read_config(path.as_ref(), "JSON")?;
    from_json_str(&content)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `USERWARE_*` environment variable overrides to a settings struct.
///
/// Boolean values accept "true", "1" and "yes". Unparseable numbers are
/// ignored and the previous value is kept.
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(val) = std::env::var("USERWARE_SECRET_KEY") {
        settings.secret_key = val;
    }

    if let Ok(val) = std::env::var("USERWARE_DEBUG") {
        settings.debug = parse_bool(&val);
    }

    if let Ok(val) = std::env::var("USERWARE_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Ok(val) = std::env::var("USERWARE_BIND_ADDRESS") {
        settings.bind_address = val;
    }

    if let Ok(val) = std::env::var("USERWARE_ALLOWED_HOSTS") {
        settings.allowed_hosts = split_list(&val);
    }

    if let Ok(val) = std::env::var("USERWARE_LOGIN_URL") {
        settings.login_url = val;
    }

    if let Ok(val) = std::env::var("USERWARE_LOGIN_REDIRECT_URL") {
        settings.login_redirect_url = val;
    }

    if let Ok(val) = std::env::var("USERWARE_LOGOUT_REDIRECT_URL") {
        settings.logout_redirect_url = val;
    }

    if let Ok(val) = std::env::var("USERWARE_SESSION_COOKIE_NAME") {
        settings.session_cookie_name = val;
    }

    if let Ok(val) = std::env::var("USERWARE_SESSION_COOKIE_SECURE") {
        settings.session_cookie_secure = parse_bool(&val);
    }

    if let Ok(val) = std::env::var("USERWARE_PASSWORD_MIN_LENGTH") {
        if let Ok(len) = val.parse::<usize>() {
            settings.userware.password_min_length = len;
        }
    }

    if let Ok(val) = std::env::var("USERWARE_USERNAME_MIN_LENGTH") {
        if let Ok(len) = val.parse::<usize>() {
            settings.userware.username_min_length = len;
        }
    }

    if let Ok(val) = std::env::var("USERWARE_RESERVED_USERNAMES") {
        settings.userware.reserved_usernames = split_list(&val);
    }

    if let Ok(val) = std::env::var("USERWARE_SWITCHED_USER_KEY") {
        settings.userware.switched_user_key = val;
    }
}

// ============================================================
// Helpers
// ============================================================

fn split_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn read_config(path: &Path, kind: &str) -> Result<String, UserwareError> {
    std::fs::read_to_string(path).map_err(|e| {
        UserwareError::ConfigurationError(format!(
            "Failed to read {kind} file '{}': {e}",
            path.display()
        ))
    })
}

/// Deep-merges `value` over the serialized default settings and deserializes the result.
fn merge_over_defaults(value: serde_json::Value, kind: &str) -> Result<Settings, UserwareError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        UserwareError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        UserwareError::ConfigurationError(format!("Failed to deserialize settings from {kind}: {e}"))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── TOML loading ────────────────────────────────────────────────

    #[test]
    fn test_from_toml_str_basic() {
        let settings = from_toml_str(
            r#"
            debug = false
            secret_key = "toml-secret"
            login_redirect_url = "/dashboard/"
            "#,
        )
        .unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.secret_key, "toml-secret");
        assert_eq!(settings.login_redirect_url, "/dashboard/");
        assert_eq!(settings.logout_redirect_url, "/");
    }

    #[test]
    fn test_from_toml_str_nested_section_keeps_defaults() {
        let settings = from_toml_str(
            r#"
            [userware]
            password_min_length = 10
            "#,
        )
        .unwrap();
        assert_eq!(settings.userware.password_min_length, 10);
        assert_eq!(settings.userware.username_min_length, 3);
        assert!(settings.userware.is_reserved("admin"));
    }

    #[test]
    fn test_from_toml_str_reserved_usernames() {
        let settings = from_toml_str(
            r#"
            [userware]
            reserved_usernames = ["boss", "owner"]
            "#,
        )
        .unwrap();
        assert_eq!(settings.userware.reserved_usernames, vec!["boss", "owner"]);
        assert!(!settings.userware.is_reserved("admin"));
    }

    #[test]
    fn test_from_toml_str_empty() {
        let settings = from_toml_str("").unwrap();
        assert_eq!(settings.session_cookie_name, "sessionid");
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let result = from_toml_str("this is = = not toml");
        assert!(matches!(result, Err(UserwareError::ConfigurationError(_))));
    }

    #[test]
    fn test_from_toml_str_wrong_type() {
        let result = from_toml_str("session_cookie_age = \"forever\"");
        assert!(result.is_err());
    }

    // ── JSON loading ────────────────────────────────────────────────

    #[test]
    fn test_from_json_str_basic() {
        let settings =
            from_json_str(r#"{"secret_key": "json-secret", "userware": {"switched_user_key": "su"}}"#)
                .unwrap();
        assert_eq!(settings.secret_key, "json-secret");
        assert_eq!(settings.userware.switched_user_key, "su");
        assert_eq!(settings.userware.password_min_length, 6);
    }

    #[test]
    fn test_from_json_str_invalid() {
        assert!(from_json_str("{not json").is_err());
    }

    // ── Files ───────────────────────────────────────────────────────

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("userware.toml");
        std::fs::write(&path, "mount_prefix = \"/accounts/\"\n").unwrap();

        let settings = from_toml_file(&path).unwrap();
        assert_eq!(settings.mount_prefix, "/accounts/");
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("userware.json");
        std::fs::write(&path, r#"{"password_reset_timeout": 60}"#).unwrap();

        let settings = from_json_file(&path).unwrap();
        assert_eq!(settings.password_reset_timeout, 60);
    }

    #[test]
    fn test_from_toml_file_missing() {
        let result = from_toml_file("/nonexistent/userware.toml");
        assert!(result.unwrap_err().to_string().contains("Failed to read TOML file"));
    }

    // ── Environment variable overrides ──────────────────────────────

    #[test]
    fn test_apply_env_overrides() {
        let mut settings = Settings::default();
        std::env::set_var("USERWARE_SECRET_KEY", "env-secret");
        std::env::set_var("USERWARE_SESSION_COOKIE_SECURE", "yes");
        std::env::set_var("USERWARE_PASSWORD_MIN_LENGTH", "12");
        std::env::set_var("USERWARE_USERNAME_MIN_LENGTH", "not-a-number");
        std::env::set_var("USERWARE_RESERVED_USERNAMES", "boss, owner,,");
        apply_env_overrides(&mut settings);
        std::env::remove_var("USERWARE_SECRET_KEY");
        std::env::remove_var("USERWARE_SESSION_COOKIE_SECURE");
        std::env::remove_var("USERWARE_PASSWORD_MIN_LENGTH");
        std::env::remove_var("USERWARE_USERNAME_MIN_LENGTH");
        std::env::remove_var("USERWARE_RESERVED_USERNAMES");

        assert_eq!(settings.secret_key, "env-secret");
        assert!(settings.session_cookie_secure);
        assert_eq!(settings.userware.password_min_length, 12);
        assert_eq!(settings.userware.username_min_length, 3);
        assert_eq!(settings.userware.reserved_usernames, vec!["boss", "owner"]);
    }

    // ── Helpers ─────────────────────────────────────────────────────

    #[test]
    fn test_merge_json_nested() {
        let base = serde_json::json!({"a": {"x": 1, "y": 2}, "b": 3});
        let over = serde_json::json!({"a": {"y": 20}});
        let merged = merge_json(base, over);
        assert_eq!(merged, serde_json::json!({"a": {"x": 1, "y": 20}, "b": 3}));
    }

    #[test]
    fn test_merge_json_array_override() {
        let base = serde_json::json!({"list": [1, 2, 3]});
        let over = serde_json::json!({"list": [9]});
        assert_eq!(merge_json(base, over), serde_json::json!({"list": [9]}));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("off"));
    }
}
