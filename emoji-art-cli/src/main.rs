//! # Emoji Art
//!
//! Command-line entry point.

use clap::Parser;
use emoji_art_cli::{CliArgs, CliConfig};
use emoji_art_document::DocumentOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,emoji_art=debug"));

    // Logs go to stderr so command output stays clean.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false);

    // Use JSON format when RUST_LOG_FORMAT=json
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = CliConfig::from(CliArgs::parse());
    tracing::debug!(data_dir = %config.data_dir.display(), "Starting emoji-art");

    let options = DocumentOptions::from_env()?;
    let mut stdout = std::io::stdout().lock();
    emoji_art_cli::run(config, options, &mut stdout).await
}
