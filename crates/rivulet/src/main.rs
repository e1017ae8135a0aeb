// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rivulet - A terminal chat client for streaming language-model endpoints.
//!
//! This is the binary entry point.

mod attachment;
mod commands;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use rivulet_config::RivuletConfig;
use rivulet_core::RivuletError;
use rivulet_transport::HttpTransport;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Rivulet - A terminal chat client for streaming language-model endpoints.
#[derive(Parser, Debug)]
#[command(name = "rivulet", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the default locations.
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Start an interactive chat (the default).
    Chat,
    /// Probe the endpoint and list its model providers.
    Health,
    /// List the models the endpoint offers.
    Models,
    /// Print the resolved configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup
    let loaded = match &cli.config {
        Some(path) => rivulet_config::load_and_validate_path(path),
        None => rivulet_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            rivulet_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.client.log_level);
    debug!(base_url = %config.endpoint.base_url, "config loaded");

    let result = match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => shell::run_shell(config).await,
        Commands::Health => run_health(&config).await,
        Commands::Models => run_models(&config).await,
        Commands::Config => print_config(&config),
    };

    if let Err(e) = result {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber with an env filter.
///
/// Logs go to stderr so they never interleave with streamed tokens.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rivulet={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

async fn run_health(config: &RivuletConfig) -> Result<(), RivuletError> {
    let transport = HttpTransport::new(&config.endpoint)?;
    let health = transport.health().await?;
    shell::print_health(&health);
    Ok(())
}

async fn run_models(config: &RivuletConfig) -> Result<(), RivuletError> {
    let transport = HttpTransport::new(&config.endpoint)?;
    shell::print_models(&transport.models().await?);
    Ok(())
}

fn print_config(config: &RivuletConfig) -> Result<(), RivuletError> {
    let rendered = config
        .to_toml()
        .map_err(|e| RivuletError::Config(e.to_string()))?;
    print!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn chat_is_the_default_command() {
        let cli = Cli::try_parse_from(["rivulet"]).unwrap();
        assert_eq!(cli.command, None);
        assert!(cli.config.is_none());
    }

    #[test]
    fn config_flag_works_after_the_subcommand() {
        let cli = Cli::try_parse_from(["rivulet", "health", "--config", "alt.toml"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Health));
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["rivulet", "serve"]).is_err());
    }

    #[test]
    fn binary_loads_config_defaults() {
        // Verify config loads with defaults (no config file needed)
        let config = rivulet_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.endpoint.base_url, "http://127.0.0.1:8082");
        assert!(print_config(&config).is_ok());
    }
}
