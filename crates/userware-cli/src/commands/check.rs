//! The `check` management command.
//!
//! Runs the configuration checks and lists the admin descriptors the
//! settings would register.

use async_trait::async_trait;
use userware_auth::AdminRegistry;
use userware_core::{CheckLevel, CheckMessage, Settings, UserwareError};

use crate::command::ManagementCommand;

/// Validates the settings.
pub struct CheckCommand;

/// Summarizes `messages`, failing when any of them is an error.
fn report(messages: &[CheckMessage]) -> Result<(), UserwareError> {
    if messages.is_empty() {
        println!("System check identified no issues.");
        return Ok(());
    }

    for msg in messages {
        match msg.level {
            CheckLevel::Error => tracing::error!(id = %msg.id, "{}", msg.msg),
            CheckLevel::Warning => tracing::warn!(id = %msg.id, "{}", msg.msg),
            CheckLevel::Info => tracing::info!(id = %msg.id, "{}", msg.msg),
        }
        println!("{msg}");
    }

    let errors = messages.iter().filter(|m| m.is_serious()).count();
    println!(
        "System check identified {} issue(s) ({errors} error(s)).",
        messages.len()
    );

    if errors > 0 {
        return Err(UserwareError::ConfigurationError(format!(
            "System check found {errors} error(s)"
        )));
    }
    Ok(())
}

#[async_trait]
impl ManagementCommand for CheckCommand {
    fn name(&self) -> &'static str {
        "check"
    }

    fn help(&self) -> &'static str {
        "Check the settings for problems"
    }

    async fn handle(
        &self,
        _matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), UserwareError> {
        let admin = AdminRegistry::from_settings(settings);
        for model in admin.models() {
            println!("Admin: {model}");
        }
        report(&settings.check())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        Settings {
            secret_key: "not-so-secret".to_string(),
            ..Settings::default()
        }
    }

    #[test]
    fn test_report_empty_is_ok() {
        assert!(report(&[]).is_ok());
    }

    #[test]
    fn test_report_warnings_only_is_ok() {
        let messages = [CheckMessage::new(CheckLevel::Warning, "careful", None, "userware.W001")];
        assert!(report(&messages).is_ok());
    }

    #[test]
    fn test_report_error_fails() {
        let messages = [
            CheckMessage::new(CheckLevel::Info, "fyi", None, "userware.I001"),
            CheckMessage::new(CheckLevel::Error, "broken", Some("fix it"), "userware.E001"),
        ];
        let err = report(&messages).unwrap_err();
        assert!(err.to_string().contains("1 error(s)"));
    }

    #[tokio::test]
    async fn test_handle_valid_settings() {
        let matches = clap::ArgMatches::default();
        assert!(CheckCommand.handle(&matches, &valid_settings()).await.is_ok());
    }

    #[tokio::test]
    async fn test_handle_empty_secret_key_fails() {
        let matches = clap::ArgMatches::default();
        let result = CheckCommand.handle(&matches, &Settings::default()).await;
        assert!(matches!(result, Err(UserwareError::ConfigurationError(_))));
    }
}
