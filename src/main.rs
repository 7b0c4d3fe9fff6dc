//! Kalends CLI entry point.

use clap::{Parser, Subcommand};
use kalends::{RecoveryConfig, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

/// Kalends: Calendar Event Recovery Engine
#[derive(Parser, Debug)]
#[command(name = "kalends")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Turn a natural-language description into a calendar event
    Parse {
        /// Event description (e.g. "lunch with Maria tomorrow at noon")
        text: String,
        /// Treat the network as unavailable
        #[arg(long)]
        offline: bool,
        /// Never pause for user confirmation
        #[arg(long)]
        no_interaction: bool,
    },
    /// Inspect the cache of requests awaiting retry
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
    /// Show recovery statistics from the outcome log
    Stats,
    /// Print current metrics in Prometheus text format
    Metrics,
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// List cached requests
    List,
    /// Remove all cached requests
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays parseable
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = if let Some(path) = &args.config {
        RecoveryConfig::from_file(path)?
    } else {
        RecoveryConfig::load()?
    };
    config.validate()?;

    match args.command {
        Command::Parse {
            text,
            offline,
            no_interaction,
        } => cli::run_parse(config, text, offline, no_interaction, args.json).await,
        Command::Cache { action } => match action {
            CacheCommand::List => cli::run_cache_list(config, args.json).await,
            CacheCommand::Clear => cli::run_cache_clear(config).await,
        },
        Command::Stats => cli::run_stats(config, args.json).await,
        Command::Metrics => cli::run_metrics(),
    }
}
