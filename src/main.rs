//! Gateway entry point: load config, wire the credential cache and the
//! accept loop, serve health/metrics, and shut down cleanly on SIGINT.

use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ctrader_gateway::config::Config;
use ctrader_gateway::error::Result;
use ctrader_gateway::modules::credentials::{CredentialCache, InMemoryStore, OAuthClient};
use ctrader_gateway::modules::gateway::{Gateway, GatewayMetrics};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting gateway against {}:{}", config.broker.host, config.broker.port);

    let http = reqwest::Client::new();
    let oauth = OAuthClient::new(http, config.broker.client_id.clone(), config.broker.client_secret.clone());
    // No durable credential store wired by default; deployments that need
    // one implement `StoreAdapter` against their own backend.
    let store = Arc::new(InMemoryStore::new());
    let credential_cache = Arc::new(CredentialCache::new(oauth, store));

    let metrics = GatewayMetrics::new();
    let health_app = ctrader_gateway::modules::gateway::health::router(metrics.clone());
    let health_port = config.gateway.health_port;
    tokio::spawn(async move {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], health_port));
        if let Err(e) = axum::Server::bind(&addr).serve(health_app.into_make_service()).await {
            error!("Health server error: {e}");
        }
    });

    let gateway = Gateway::new(config, credential_cache, metrics);
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received shutdown signal");
    };

    gateway.run(shutdown).await
}
