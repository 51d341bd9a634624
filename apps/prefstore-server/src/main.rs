mod config;
mod logging;
mod server;
mod signals;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;

use crate::config::AppConfig;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Prefstore Server - per-user preference store over HTTP
#[derive(Parser)]
#[command(name = "prefstore-server")]
#[command(about = "Prefstore Server - per-user preference store over HTTP")]
#[command(version)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration (JSON, secret redacted) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use the in-memory store instead of DynamoDB
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = cli.config.as_deref() {
        if !path.is_file() {
            anyhow::bail!("config file does not exist: {}", path.display());
        }
    }

    // defaults -> YAML (if provided) -> env -> CLI overrides
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(cli.port, cli.mock, cli.verbose);

    logging::init(&config.log_level, config.log_format)?;

    if cli.print_config {
        println!("{}", config.to_redacted_json()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            tracing::info!(version = env!("CARGO_PKG_VERSION"), "Prefstore Server starting");
            server::run(&config).await
        }
        Commands::Check => {
            check_config(&config);
            Ok(())
        }
    }
}

fn check_config(config: &AppConfig) {
    tracing::info!(
        backend = ?config.store_backend,
        dev_bypass_auth = config.dev_bypass_auth,
        "configuration is valid"
    );
    println!("Configuration is valid");
}
