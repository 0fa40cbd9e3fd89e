//! Pyrium - run compiled `.pybc` mods against an in-memory world

use anyhow::Result;
use clap::{Parser, Subcommand};
use pyrium_vm_runtime::RuntimeConfig;
use std::path::PathBuf;
use tracing_subscriber::filter::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "pyrium")]
#[command(version, about = "Pyrium VM host", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ./pyrium.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a mods directory and tick it
    Run(commands::run::RunCommand),

    /// Decode a module and print its disassembly
    Inspect(commands::inspect::InspectCommand),

    /// Show format and opcode information
    Info(commands::info::InfoCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run(cmd) => {
            let config = RuntimeConfig::load_or_default(cli.config.as_deref())?;
            cmd.run(config).await
        }
        Commands::Inspect(cmd) => cmd.run(),
        Commands::Info(cmd) => cmd.run(),
    }
}
