//! threadcard binary: composition root.
//!
//! 1. Parse the CLI and load configuration from TOML
//! 2. Install the tracing subscriber
//! 3. `serve`: build the record store client, the chat notifier and the
//!    notification worker, then run the webhook listener
//! 4. `inspect`: print a collection's schema and form plan

mod cli;
mod inspect;
mod notifier;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use threadcard_core::config::secret_from_env;
use threadcard_core::{ChannelConfigStore, ThreadcardConfig};
use threadcard_store::HttpRecordStore;
use threadcard_webhook::{start_server, NotificationRouter, WebhookState};
use tracing_subscriber::EnvFilter;

use crate::cli::{resolve_port, CliArgs, Command};
use crate::notifier::RestChatNotifier;

/// Channel configuration file: absolute paths as given, relative ones under
/// the data directory.
fn channels_path(config: &ThreadcardConfig) -> PathBuf {
    let path = Path::new(&config.channels.path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        Path::new(&config.general.data_dir).join(path)
    }
}

async fn run_serve(config: ThreadcardConfig, port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let store_token = secret_from_env(&config.store.token_env)?;
    let store = Arc::new(HttpRecordStore::new(&config.store, store_token)?);
    tracing::info!(base_url = %config.store.base_url, "Record store client ready");

    let chat_token = secret_from_env(&config.chat.token_env)?;
    let notifier = Arc::new(RestChatNotifier::new(&config.chat, chat_token)?);

    let channels_file = channels_path(&config);
    let channels = Arc::new(ChannelConfigStore::new(&channels_file));
    tracing::info!(path = %channels_file.display(), "Channel configuration store ready");

    let router = Arc::new(NotificationRouter::new(
        store,
        notifier,
        channels,
        &config.chat.channel_link_pattern,
    )?);
    let (state, events) = WebhookState::new(config.webhook.queue_capacity);
    tokio::spawn(router.run(events));

    let mut webhook = config.webhook.clone();
    webhook.port = resolve_port(port, webhook.port);
    start_server(&webhook, state).await?;
    Ok(())
}

async fn run_inspect(
    config: ThreadcardConfig,
    url: String,
    create: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let token = secret_from_env(&config.store.token_env)?;
    let store = HttpRecordStore::new(&config.store, token)?;
    let report = inspect::inspect(&store, &url, &create).await?;
    println!("{}", report);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config_file = args.resolve_config_path();
    let config = ThreadcardConfig::load_or_default(&config_file);

    // RUST_LOG wins over --log-level, which wins over the config file.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    tracing::info!(
        path = %config_file.display(),
        "Starting threadcard v{}",
        env!("CARGO_PKG_VERSION")
    );

    match args.command {
        Command::Serve { port } => run_serve(config, port).await,
        Command::Inspect { url, create } => run_inspect(config, url, create).await,
    }
}
