//! # userware-cli
//!
//! Management commands for userware.
//!
//! - [`command`] - The [`ManagementCommand`] trait and the [`CommandSet`]
//!   that builds the `clap` interface and dispatches to handlers
//! - [`commands`] - Built-in commands: `runserver`, `check` and `createuser`
//!
//! [`load_settings`] resolves the settings a command runs with.
//!
//! ## Quick Start
//!
//! ```rust
//! use userware_cli::commands::builtin_commands;
//!
//! let matches = builtin_commands()
//!     .build_cli()
//!     .try_get_matches_from(["userware", "runserver", "--port", "8080"])
//!     .unwrap();
//! assert_eq!(matches.subcommand_name(), Some("runserver"));
//! ```

// - result_large_err: UserwareError is the crate-wide error type
// - unused_async: command handlers keep a uniform async signature
#![allow(clippy::result_large_err)]
#![allow(clippy::unused_async)]

pub mod command;
pub mod commands;

use userware_core::{settings_loader, Settings, UserwareError};

pub use command::{CommandSet, ManagementCommand};

/// Loads the settings for a command run.
///
/// A `--settings` file is read and merged over the defaults; `USERWARE_*`
/// environment variables are applied in both cases.
pub fn load_settings(matches: &clap::ArgMatches) -> Result<Settings, UserwareError> {
    match matches.get_one::<String>(command::SETTINGS_ARG) {
        Some(path) => settings_loader::from_toml_file_with_env(path),
        None => Ok(settings_loader::from_env()),
    }
}
