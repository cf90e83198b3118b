//! PetScale CLI - rule profile editing and scenario replay
//!
//! This CLI lets users and developers:
//! - Add, list and remove companion scale rules
//! - Switch the forced-override mode
//! - Inspect the tracked companion kinds
//! - Replay a recorded world through the engine

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod output;

use commands::{kinds, mode, rules, simulate};
use config::CliConfig;
use error::CliResult;

/// PetScale CLI application
#[derive(Parser)]
#[command(name = "pscale")]
#[command(about = "PetScale - companion scale rules", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PSCALE_CONFIG")]
    config: Option<String>,

    /// Rule profile path
    #[arg(short, long, env = "PSCALE_PROFILE")]
    profile: Option<PathBuf>,

    /// Output format (table, json, yaml)
    #[arg(short, long, default_value = "table")]
    output: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Manage scale rules
    Rules {
        #[command(subcommand)]
        command: rules::RulesCommands,
    },

    /// Show or set the forced-override mode (off, self, others, all)
    Mode {
        /// New mode
        mode: Option<String>,
    },

    /// List tracked companion kinds
    Kinds,

    /// Replay a scenario through the engine
    Simulate(simulate::SimulateArgs),

    /// Show configuration
    Config,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    // Load config
    let config = CliConfig::load(cli.config.as_deref())?;
    let profile_path = config.profile_path(cli.profile.as_deref())?;
    let engine_config = config.engine_config();

    // Execute command
    match cli.command {
        Commands::Rules { command } => {
            let mut engine = commands::open_profile(&profile_path, engine_config)?;
            rules::execute(command, &mut engine, cli.output)
        }
        Commands::Mode { mode: requested } => {
            let mut engine = commands::open_profile(&profile_path, engine_config)?;
            mode::execute(requested, &mut engine, cli.output)
        }
        Commands::Kinds => kinds::execute(cli.output),
        Commands::Simulate(args) => {
            simulate::execute(args, &profile_path, engine_config, cli.output).await
        }
        Commands::Config => {
            println!("Profile: {}", profile_path.display());
            println!("Engine: {:?}", engine_config);
            println!("Config: {:?}", config);
            Ok(())
        }
    }
}
