//! refprune CLI - finds redundant references in MSBuild project trees.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "refprune")]
#[command(about = "Find redundant package and project references in .NET solutions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output (-v info, -vv debug, -vvv trace). RUST_LOG wins when set.
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze the manifests under a directory
    Analyze(commands::AnalyzeArgs),

    /// Manage refprune configuration
    Config {
        /// Configuration file (default: ~/.refprune/config.toml)
        #[arg(long, value_name = "FILE", global = true)]
        config: Option<std::path::PathBuf>,

        #[command(subcommand)]
        command: commands::ConfigCommand,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> miette::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = match cli.command {
        Command::Analyze(args) => commands::run_analysis(args).await,
        Command::Config { config, command } => {
            commands::handle_config_command(command, config.as_deref()).await
        }
    };
    outcome.map_err(|e| miette::miette!("{e:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_flags() {
        let cli = Cli::try_parse_from([
            "refprune", "analyze", "src", "--packages", "--apply", "-vv", "--output", "json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.root, std::path::PathBuf::from("src"));
        assert!(args.packages && args.apply);
        assert!(!args.projects && !args.upgrades);
    }

    #[test]
    fn test_analyze_defaults_to_current_directory() {
        let cli = Cli::try_parse_from(["refprune", "analyze"]).unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.root, std::path::PathBuf::from("."));
        assert!(args.config.is_none());
    }
}
