//! # devsync
//!
//! CLI tool for exercising the devsync battery and lock protocol.
//!
//! ## Commands
//!
//! - `init`: Write a device configuration file
//! - `simulate`: Run this device against an in-process peer
//! - `decode`: Inspect newline-delimited packet frames
//!
//! ## Example
//!
//! ```bash
//! # Write a configuration
//! devsync init --name "Laptop"
//!
//! # Watch a peer drain below the low threshold, then lock it
//! devsync simulate --peer-charge 20 --peer-discharge-to 9 --lock-peer
//!
//! # Inspect captured frames
//! devsync decode frames.jsonl
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use devsync_link::LinkConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{decode, init, simulate};

/// CLI tool for exercising the devsync protocol.
#[derive(Parser, Debug)]
#[command(name = "devsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Device name
        #[arg(long, short)]
        name: Option<String>,

        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Run this device against a simulated peer
    Simulate {
        /// This device's battery charge
        #[arg(long, default_value_t = 80)]
        charge: i32,

        /// This device is charging
        #[arg(long)]
        charging: bool,

        /// The peer's battery charge
        #[arg(long, default_value_t = 50)]
        peer_charge: i32,

        /// The peer is charging
        #[arg(long)]
        peer_charging: bool,

        /// The peer starts locked
        #[arg(long)]
        peer_locked: bool,

        /// Ask the peer to lock
        #[arg(long)]
        lock_peer: bool,

        /// Drain the peer's battery to this charge mid-session
        #[arg(long)]
        peer_discharge_to: Option<i32>,

        /// How long to keep the link up, in milliseconds
        #[arg(long, default_value_t = 100)]
        settle_ms: u64,
    },

    /// Inspect newline-delimited packet frames
    Decode {
        /// Input file (default: stdin)
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };

    match cli.command {
        Commands::Init { name, force } => {
            init::run(&config_path, name.as_deref(), force)?;
        }
        Commands::Simulate {
            charge,
            charging,
            peer_charge,
            peer_charging,
            peer_locked,
            lock_peer,
            peer_discharge_to,
            settle_ms,
        } => {
            let config = load_config(&config_path)?;
            let options = simulate::SimulateOptions {
                host_charge: charge,
                host_charging: charging,
                peer_charge,
                peer_charging,
                peer_locked,
                lock_peer,
                peer_discharge_to,
                settle: Duration::from_millis(settle_ms),
            };
            simulate::run(&config, &options).await?;
        }
        Commands::Decode { file } => {
            decode::run(file.as_deref())?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_config_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("org", "devsync", "devsync")
        .context("Could not determine a configuration directory")?;
    Ok(dirs.config_dir().join("devsync.toml"))
}

fn load_config(path: &Path) -> Result<LinkConfig> {
    if path.exists() {
        LinkConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))
    } else {
        tracing::debug!("No config at {}, using defaults", path.display());
        Ok(simulate::ephemeral_config())
    }
}
