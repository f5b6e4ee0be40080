use anyhow::{Context, Result};
use call_translator::{create_router, AppState, Config, NatsAdapterFactory};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "call-translator", about = "Relays call audio through a speech translation service")]
struct Args {
    /// Config file path (extension optional)
    #[arg(short, long, default_value = "config/call-translator")]
    config: String,

    /// Override the HTTP bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;

    if let Some(bind) = args.bind {
        cfg.service.http.bind = bind;
    }
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    info!("Loaded config: {}", cfg.service.name);
    info!("Speech bus: {}", cfg.speech.nats_url);
    info!(
        "Relay: {}-byte frames, remainder policy {:?}, captions scope {:?}",
        cfg.relay.frame_size, cfg.relay.remainder, cfg.captions.scope
    );

    // Sessions fail individually without credentials; warn early
    if let Err(e) = cfg.speech.credentials() {
        warn!("{}", e);
    }

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let adapters = Arc::new(NatsAdapterFactory::new(cfg.speech.clone()));
    let state = AppState::new(cfg, adapters).context("Invalid relay configuration")?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(state))
        .await
        .context("HTTP server error")?;

    Ok(())
}
