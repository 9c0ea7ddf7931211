mod config;
mod network;
mod renderer;

use config::ServerConfig;
use parapet_fallback::Fallback;
use renderer::BitmapRenderer;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Parapet fallback...");

    let config = Arc::new(ServerConfig::load(Path::new("config/server.toml"))?);
    info!(
        "Config loaded: bind={}:{}, compression={:?}, captcha={:?}, gravity={}",
        config.bind,
        config.port,
        config.compression(),
        config.fallback.captcha.timing,
        config.fallback.gravity.enabled
    );

    let fallback = Arc::new(Fallback::new(
        config.fallback.clone(),
        Arc::new(BitmapRenderer::new()),
    )?);

    if let Some(batch) = fallback.prepare_captchas() {
        tokio::spawn(async move {
            match batch.await {
                Ok(count) => info!("Prepared {} CAPTCHA images", count),
                Err(e) => warn!("CAPTCHA preparation failed: {}", e),
            }
        });
    }

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        _ = accept_loop(listener, fallback, config) => {
            error!("Accept loop exited unexpectedly");
        }
    }

    Ok(())
}

async fn accept_loop(listener: TcpListener, fallback: Arc<Fallback>, config: Arc<ServerConfig>) {
    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                debug!("New connection from {}", peer);
                let fallback = fallback.clone();
                let config = config.clone();
                tokio::spawn(network::handle_connection(socket, fallback, config));
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
