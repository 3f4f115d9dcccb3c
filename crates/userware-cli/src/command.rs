//! The `userware` command line.
//!
//! Each subcommand implements [`ManagementCommand`]. A [`CommandSet`] turns
//! the registered commands into one `clap` interface and runs whichever
//! subcommand was parsed.

use async_trait::async_trait;
use userware_core::{Settings, UserwareError};

/// Name of the global option selecting a TOML settings file.
pub const SETTINGS_ARG: &str = "settings";

/// A `userware` subcommand.
#[async_trait]
pub trait ManagementCommand: Send + Sync {
    /// The subcommand name.
    fn name(&self) -> &'static str;

    /// One-line description shown in `--help`.
    fn help(&self) -> &'static str;

    /// Adds the subcommand's own arguments.
    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd
    }

    /// Runs the subcommand with its parsed arguments.
    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), UserwareError>;
}

/// The subcommands of the `userware` binary, in `--help` order.
#[derive(Default)]
pub struct CommandSet {
    commands: Vec<Box<dyn ManagementCommand>>,
}

impl CommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `command`. A later command with the same name wins.
    pub fn register(&mut self, command: Box<dyn ManagementCommand>) {
        self.commands.retain(|existing| existing.name() != command.name());
        self.commands.push(command);
    }

    /// Builds the `userware` command with the global `--settings` option.
    pub fn build_cli(&self) -> clap::Command {
        let settings = clap::Arg::new(SETTINGS_ARG)
            .long(SETTINGS_ARG)
            .global(true)
            .value_name("FILE")
            .help("TOML settings file; USERWARE_* variables still apply");

        self.commands.iter().fold(
            clap::Command::new("userware")
                .about("Account management for userware applications")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .arg(settings),
            |cli, command| {
                cli.subcommand(command.add_arguments(
                    clap::Command::new(command.name()).about(command.help()),
                ))
            },
        )
    }

    /// Runs the subcommand selected in `matches`.
    pub async fn execute(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), UserwareError> {
        let Some((name, sub_matches)) = matches.subcommand() else {
            return Err(UserwareError::ConfigurationError(
                "No subcommand specified".to_string(),
            ));
        };
        let command = self
            .commands
            .iter()
            .find(|command| command.name() == name)
            .ok_or_else(|| UserwareError::ConfigurationError(format!("Unknown command: {name}")))?;

        tracing::debug!(command = name, "Running management command");
        command.handle(sub_matches, settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{builtin_commands, CheckCommand};

    fn parse(args: &[&str]) -> clap::ArgMatches {
        builtin_commands().build_cli().try_get_matches_from(args).unwrap()
    }

    fn checked_settings() -> Settings {
        Settings {
            secret_key: "cli-secret".to_string(),
            ..Settings::default()
        }
    }

    #[test]
    fn test_help_lists_userware_commands() {
        let cli = builtin_commands().build_cli();
        let names: Vec<&str> = cli.get_subcommands().map(clap::Command::get_name).collect();
        assert_eq!(names, ["runserver", "check", "createuser"]);
    }

    #[test]
    fn test_bare_invocation_is_rejected() {
        assert!(builtin_commands().build_cli().try_get_matches_from(["userware"]).is_err());
    }

    #[test]
    fn test_settings_option_after_subcommand() {
        let matches = parse(&["userware", "runserver", "--port", "9000", "--settings", "u.toml"]);
        assert_eq!(
            matches.get_one::<String>(SETTINGS_ARG).map(String::as_str),
            Some("u.toml")
        );
        let (_, runserver) = matches.subcommand().unwrap();
        assert_eq!(runserver.get_one::<u16>("port"), Some(&9000));
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut set = builtin_commands();
        set.register(Box::new(CheckCommand));
        let cli = set.build_cli();
        assert_eq!(cli.get_subcommands().count(), 3);
        assert_eq!(cli.get_subcommands().last().unwrap().get_name(), "check");
    }

    #[tokio::test]
    async fn test_execute_runs_check() {
        let set = builtin_commands();
        let matches = parse(&["userware", "check"]);
        assert!(set.execute(&matches, &checked_settings()).await.is_ok());

        let result = set.execute(&matches, &Settings::default()).await;
        assert!(matches!(result, Err(UserwareError::ConfigurationError(_))));
    }

    #[tokio::test]
    async fn test_execute_runs_createuser() {
        let set = builtin_commands();
        let matches = parse(&[
            "userware",
            "createuser",
            "--username",
            "admin",
            "--email",
            "admin@x.com",
            "--password",
            "Secret123",
        ]);
        let result = set.execute(&matches, &checked_settings()).await;
        assert!(matches!(result, Err(UserwareError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_execute_without_subcommand() {
        let set = CommandSet::new();
        let result = set.execute(&clap::ArgMatches::default(), &Settings::default()).await;
        assert!(matches!(result, Err(UserwareError::ConfigurationError(_))));
    }
}
