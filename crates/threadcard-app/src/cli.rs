//! CLI argument definitions for the threadcard binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// threadcard: turn chat threads into records of a structured store.
#[derive(Parser, Debug)]
#[command(name = "threadcard", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the webhook listener and the notification worker.
    Serve {
        /// Webhook listener port.
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,
    },
    /// Print a collection's normalized schema and the creation form it yields.
    Inspect {
        /// Collection URL.
        #[arg(long)]
        url: String,
        /// Properties to place on the creation form.
        #[arg(long = "create", num_args = 1..)]
        create: Vec<String>,
    },
}

impl CliArgs {
    /// Priority: --config flag > THREADCARD_CONFIG env var > ./threadcard.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("THREADCARD_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("threadcard.toml")
    }

    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Priority: --port flag > PORT env var > config file value.
pub fn resolve_port(flag: Option<u16>, config_port: u16) -> u16 {
    if let Some(p) = flag {
        return p;
    }
    if let Ok(val) = std::env::var("PORT") {
        if let Ok(p) = val.parse::<u16>() {
            return p;
        }
    }
    config_port
}
