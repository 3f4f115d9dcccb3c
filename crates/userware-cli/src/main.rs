use std::process::ExitCode;

use userware_cli::commands::builtin_commands;
use userware_cli::load_settings;
use userware_core::logging::setup_logging;

#[tokio::main]
async fn main() -> ExitCode {
    let commands = builtin_commands();
    let matches = commands.build_cli().get_matches();

    let settings = match load_settings(&matches) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&settings);

    match commands.execute(&matches, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
