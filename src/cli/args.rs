//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// modlayer - Dependency installation with reusable module layers
///
/// Picks an installation process from what the project provides, reuses
/// the previous module layer when the lockfile is unchanged, and links the
/// installed tree into the working directory.
#[derive(Parser, Debug)]
#[command(name = "modlayer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "MODLAYER_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install dependencies into the modules layer
    Build(BuildArgs),

    /// Show which installation process would be selected
    Resolve(ResolveArgs),

    /// Print the fingerprint of a lockfile
    Sum(SumArgs),

    /// Show configuration
    Config(ConfigArgs),
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Project directory (defaults to current directory)
    #[arg(short, long)]
    pub working_dir: Option<PathBuf>,

    /// Directory holding layers and their records
    #[arg(short, long, env = "MODLAYER_LAYERS_DIR")]
    pub layers_dir: PathBuf,
}

/// Arguments for the resolve command
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Project directory (defaults to current directory)
    #[arg(short, long)]
    pub working_dir: Option<PathBuf>,

    /// Directory holding layers, used to recognise our own links
    #[arg(short, long, env = "MODLAYER_LAYERS_DIR")]
    pub layers_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Output format for reporting commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Build log lines
    #[default]
    Text,
    /// JSON object
    Json,
}

/// Arguments for the sum command
#[derive(Parser, Debug)]
pub struct SumArgs {
    /// File to fingerprint
    pub path: PathBuf,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_build() {
        let cli = Cli::parse_from([
            "modlayer",
            "-vv",
            "build",
            "--working-dir",
            "/app",
            "--layers-dir",
            "/layers",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.working_dir, Some(PathBuf::from("/app")));
                assert_eq!(args.layers_dir, PathBuf::from("/layers"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn config_action_optional() {
        let cli = Cli::parse_from(["modlayer", "config"]);
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigArgs { action: None })
        ));
    }
}
