//! # flagstream
//!
//! CLI tool for watching a flag stream.
//!
//! ## Commands
//!
//! - `watch`: Connect to the stream and keep an in-memory store in sync
//! - `fetch`: Request flags out-of-band, the way indirect events do
//!
//! ## Example
//!
//! ```bash
//! # Follow the stream until Ctrl-C
//! flagstream --config flagstream.toml watch
//!
//! # Fetch one flag
//! flagstream --config flagstream.toml fetch --key beta-ui
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flagstream_client::StreamConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{fetch, watch};

/// CLI tool for watching a flag stream.
#[derive(Parser, Debug)]
#[command(name = "flagstream")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short, global = true, default_value = "flagstream.toml")]
    config: PathBuf,

    /// Log at debug level (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to the stream and report errors until Ctrl-C
    Watch {
        /// Seconds to wait for the first full flag set
        #[arg(long, default_value = "30")]
        ready_timeout: u64,
    },

    /// Request flags out-of-band
    Fetch {
        /// Fetch only this flag
        #[arg(long, short)]
        key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = StreamConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    match cli.command {
        Commands::Watch { ready_timeout } => {
            watch::run(config, ready_timeout).await?;
        }
        Commands::Fetch { key } => {
            fetch::run(&config, key.as_deref()).await?;
        }
    }

    Ok(())
}
