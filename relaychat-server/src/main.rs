//! Relaychat server entry point

use anyhow::{Context, Result};
use clap::Parser;
use relaychat_core::config::{read_from_path, ConfigValidator, SafeLogging};
use relaychat_core::{ChatRelay, RelayConfig};
use relaychat_server::{logging, serve, AppState};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;

/// Relay chat conversations to an LLM provider over HTTP
#[derive(Parser, Debug)]
#[command(name = "relaychat-server", version, about, long_about = None)]
struct Args {
    /// Configuration file (.yaml, .yml or .json); defaults plus OPENAI_API_KEY otherwise
    #[arg(short, long, env = "RELAYCHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen address from the configuration
    #[arg(short, long)]
    bind: Option<String>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Load the settings, apply command-line overrides, then validate once
fn resolve_config(args: &Args) -> Result<RelayConfig> {
    let mut config = match &args.config {
        Some(path) => read_from_path(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => RelayConfig::from_env().context("building configuration from the environment")?,
    };
    if let Some(bind) = &args.bind {
        config.server.bind = bind.clone();
    }
    ConfigValidator::new()
        .validate(&config)
        .context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(&args.log_level);

    let config = resolve_config(&args)?;

    info!("Starting relay: {}", config.safe_for_logging());

    let relay = ChatRelay::new(&config).context("creating relay")?;
    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;

    serve(listener, AppState::new(relay)).await
}
