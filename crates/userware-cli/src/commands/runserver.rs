//! The `runserver` management command.
//!
//! Serves the account routes with in-memory directory and session backends.

use std::sync::Arc;

use async_trait::async_trait;
use userware_auth::{build_app, UserwareState};
use userware_core::{CheckLevel, Settings, UserwareError};

use crate::command::ManagementCommand;

/// Starts the account server.
///
/// Without `--host`/`--port` the server binds to `bind_address` from the
/// settings. The server does not start while `Settings::check` reports an
/// error.
pub struct RunserverCommand;

/// Resolves the bind address from the arguments, falling back to the settings.
fn bind_address(matches: &clap::ArgMatches, settings: &Settings) -> String {
    let (default_host, default_port) = settings
        .bind_address
        .rsplit_once(':')
        .unwrap_or((settings.bind_address.as_str(), "8000"));
    let host = matches
        .get_one::<String>("host")
        .map_or(default_host, String::as_str);
    let port = matches
        .get_one::<u16>("port")
        .map_or_else(|| default_port.to_string(), ToString::to_string);
    format!("{host}:{port}")
}

/// Logs the check results and fails if any of them is an error.
fn ensure_servable(settings: &Settings) -> Result<(), UserwareError> {
    let messages = settings.check();
    for msg in &messages {
        match msg.level {
            CheckLevel::Error => tracing::error!(id = %msg.id, "{}", msg.msg),
            CheckLevel::Warning => tracing::warn!(id = %msg.id, "{}", msg.msg),
            CheckLevel::Info => {}
        }
    }
    let errors: Vec<&str> = messages
        .iter()
        .filter(|msg| msg.is_serious())
        .map(|msg| msg.id.as_str())
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(UserwareError::ConfigurationError(format!(
            "Refusing to serve with failed checks: {}",
            errors.join(", ")
        )))
    }
}

#[async_trait]
impl ManagementCommand for RunserverCommand {
    fn name(&self) -> &'static str {
        "runserver"
    }

    fn help(&self) -> &'static str {
        "Serve the account routes"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("host")
                .long("host")
                .help("Host to bind to"),
        )
        .arg(
            clap::Arg::new("port")
                .long("port")
                .value_parser(clap::value_parser!(u16))
                .help("Port to bind to"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), UserwareError> {
        ensure_servable(settings)?;
        let addr = bind_address(matches, settings);
        let state = Arc::new(UserwareState::new(settings.clone()));
        let app = build_app(&state)?;

        tracing::info!(
            prefix = %settings.mount_prefix,
            debug = settings.debug,
            "Starting account server at http://{addr}/"
        );
        app.run(&addr).await
    }
}
