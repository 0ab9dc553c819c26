//! Background worker binary.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use adforge_engine::{EngineConfig, Orchestrator, StoredKeyResolver};
use adforge_providers::ProviderRegistry;
use adforge_store::{GenerationRepository, PostgrestClient, ProviderKeyRepository};
use adforge_storage::{AssetPersister, R2Client};
use adforge_worker::{JobPoller, PollerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("adforge=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }

    info!("Starting adforge-worker");

    let orchestrator = build_orchestrator()
        .await
        .context("Failed to wire orchestrator")?;

    let config = PollerConfig::from_env();
    let poller = JobPoller::new(orchestrator, config);
    let shutdown = poller.shutdown_handle();

    let poller_task = tokio::spawn(async move { poller.run().await });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to install CTRL+C handler")?;
    info!("Received shutdown signal");

    shutdown.send(true).ok();
    poller_task.await.context("Poller task panicked")?;

    info!("Worker shutdown complete");
    Ok(())
}

async fn build_orchestrator() -> anyhow::Result<Arc<Orchestrator>> {
    let postgrest = PostgrestClient::from_env().context("Store config")?;
    let jobs = GenerationRepository::new(postgrest.clone());
    let keys = ProviderKeyRepository::new(postgrest);

    let storage = R2Client::from_env().await.context("Storage config")?;
    let persister = AssetPersister::new(storage).context("Asset persister")?;

    let registry = Arc::new(ProviderRegistry::from_env());

    Ok(Arc::new(Orchestrator::new(
        registry,
        Arc::new(jobs),
        Arc::new(persister),
        Arc::new(StoredKeyResolver::new(keys)),
        EngineConfig::from_env(),
    )))
}
