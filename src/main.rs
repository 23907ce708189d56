//! modlayer - Dependency installation with reusable module layers
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use modlayer::cli::{Cli, Commands};
use modlayer::config::ConfigManager;
use modlayer::error::ModlayerResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ModlayerResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("modlayer=warn"),
        1 => EnvFilter::new("modlayer=info"),
        _ => EnvFilter::new("modlayer=debug"),
    };

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    // Diagnostics go to stderr so stdout carries only the build log
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Build(args) => modlayer::cli::commands::build(args, &config).await,
        Commands::Resolve(args) => modlayer::cli::commands::resolve(args, &config).await,
        Commands::Sum(args) => modlayer::cli::commands::sum(args).await,
        Commands::Config(args) => {
            modlayer::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
