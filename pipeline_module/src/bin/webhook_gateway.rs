#[path = "webhook_gateway/config.rs"]
mod config;
#[path = "webhook_gateway/handlers.rs"]
mod handlers;
#[path = "webhook_gateway/state.rs"]
mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pipeline_module::{Pipeline, PipelineConfig, PipelineContext};

use config::{
    load_gateway_config, resolve_gateway_config_path, resolve_listen_address,
    resolve_max_body_bytes, resolve_max_in_flight, GatewayConfigFile,
};
use handlers::{crc_challenge, health, receive_webhook};
use state::{GatewayState, PipelineRunner};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    dotenvy::dotenv().ok();

    let config_path = resolve_gateway_config_path();
    let config_file = match config_path.as_deref() {
        Some(path) => load_gateway_config(path)?,
        None => GatewayConfigFile::default(),
    };
    let lookup = |key: &str| env::var(key).ok();
    let (host, port) = resolve_listen_address(&config_file, lookup);
    let max_body_bytes = resolve_max_body_bytes(&config_file, lookup);
    let max_in_flight = resolve_max_in_flight(&config_file, lookup);

    let pipeline_config = PipelineConfig::from_env()?;
    let ctx = PipelineContext::from_config(pipeline_config)?;
    let runner = PipelineRunner::new(Pipeline::new(ctx), max_in_flight);
    let state = Arc::new(GatewayState {
        runner: runner.clone(),
    });

    info!(
        "webhook gateway config path={}, host={}, port={}, max_in_flight={}",
        config_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<defaults>".to_string()),
        host,
        port,
        max_in_flight
    );

    let app = Router::new()
        .route("/health", get(health))
        .route("/twitter/webhook", get(crc_challenge).post(receive_webhook))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes));

    let addr: std::net::SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("webhook gateway listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    runner.drain().await;
    Ok(())
}
