//! Relgate CLI entry point
//!
//! Loads configuration, initialises tracing, and dispatches to the
//! subcommand handlers. Errors map to process exit codes via
//! [`error::CliError::exit_code`].

mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use relgate_core::config::RelgateConfig;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    };

    init_tracing(&cli, &config);

    if let Err(e) = run(cli, &config).await {
        tracing::error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, config: &RelgateConfig) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    match cli.command {
        Commands::Check(args) => commands::check::execute(args, config, &writer).await,
        Commands::Pattern(args) => commands::pattern::execute(args, &writer),
    }
}

/// Load `relgate.toml` if present; a missing file falls back to defaults
/// with environment overrides still applied.
async fn load_config(cli: &Cli) -> Result<RelgateConfig, CliError> {
    if cli.config.exists() {
        RelgateConfig::load(&cli.config)
            .await
            .map_err(|e| CliError::Config(e.to_string()))
    } else {
        let mut config = RelgateConfig::default();
        config.apply_env_overrides();
        config
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        Ok(config)
    }
}

/// Initialise tracing to stderr so report output on stdout stays clean.
fn init_tracing(cli: &Cli, config: &RelgateConfig) {
    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.general.log_level);
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
