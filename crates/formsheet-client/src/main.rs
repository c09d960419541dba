//! formsheet CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use formsheet_core::{init_tracing, TracingConfig};

use formsheet_client::cli::Cli;
use formsheet_client::commands;
use formsheet_client::config::Settings;
use formsheet_client::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.json_logs {
        TracingConfig::plugin()
    } else if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let mut settings = if cli.config.is_some() {
        Settings::load_from(&config_path).map_err(ClientError::Config)?
    } else {
        Settings::load().map_err(ClientError::Config)?
    };
    if let Some(dir) = cli.actions_dir {
        settings.actions_dir = dir;
    }

    commands::execute(cli.command, settings, &config_path).await
}
