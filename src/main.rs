//! Chat relay server.
//!
//! ```text
//!   Browser ──POST /api/chat──▶ ┌───────────────────────────────────────┐
//!                               │ request id → access log → CORS/origin │
//!                               │ → body limit → rate limit (per IP)    │
//!                               │ → validate → system prompt + model    │
//!                               └──────────────────┬────────────────────┘
//!                                                  │ POST /chat/completions
//!                                                  ▼
//!                                           Upstream LLM API
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use chat_relay::config::{load_config, ConfigWatcher, RelayConfig};
use chat_relay::net::tls::load_tls_config;
use chat_relay::observability::logging;
use chat_relay::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "chat-relay", version)]
#[command(about = "Relay chat messages to an LLM completion API with an injected system prompt")]
struct Args {
    /// Path to the TOML config file. Defaults are used when omitted.
    #[arg(short, long, env = "CHAT_RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,

    /// Reload prompt, upstream and limit settings when the config file changes.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default().finalize()?,
    };

    if args.check {
        println!("configuration OK");
        return Ok(());
    }

    logging::init(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "chat-relay starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        default_model = %config.upstream.default_model,
        allowed_origins = ?config.cors.allowed_origins,
        rate_limit_enabled = config.rate_limit.enabled,
        max_body_bytes = config.limits.max_body_bytes,
        "Configuration loaded"
    );

    let tls = match &config.listener.tls {
        Some(tls) => Some(load_tls_config(tls).await?),
        None => None,
    };

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        (None, true) => {
            tracing::warn!("--watch needs --config, hot reload disabled");
            (None, mpsc::unbounded_channel().1)
        }
        _ => (None, mpsc::unbounded_channel().1),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let mut server = HttpServer::new(config)?;
    if let Some(tls) = tls {
        server = server.with_tls(tls);
    }
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
