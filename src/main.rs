// src/main.rs

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use storyteller::api::http::app_router;
use storyteller::config::CONFIG;
use storyteller::create_app_state;

/// Story, illustration and PDF export backend
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Address to bind (overrides STORY_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(long, short)]
    port: Option<u16>,

    /// Log level: trace, debug, info, warn, error (overrides STORY_LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = CONFIG.clone();
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.tracing_level())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting storyteller v{}", env!("CARGO_PKG_VERSION"));
    info!("Text model: {}, image model: {}", config.text_model, config.image_model);

    let bind_address = config.bind_address();
    let app_state = Arc::new(create_app_state(config)?);
    let app = app_router(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("HTTP server listening on http://{}/api", bind_address);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
