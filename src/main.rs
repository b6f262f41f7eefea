use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use propdesk::config::AppConfig;
use propdesk::http_client::ReqwestTransport;
use propdesk::pipeline::Services;
use propdesk::server::create_router;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    let bind_addr = config.bind_addr.clone();
    info!(
        data_dir = %config.data_dir.display(),
        season_start = %config.season_start,
        tank01 = config.tank01.api_key.is_some(),
        sportradar = config.sportradar.api_key.is_some(),
        speech = config.speech.api_key.is_some(),
        "starting propdesk"
    );

    let services = Arc::new(Services::new(config, Arc::new(ReqwestTransport)));
    let app = create_router(services);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
