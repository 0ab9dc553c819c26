//! Application state.

use std::sync::Arc;

use adforge_engine::{EngineConfig, Orchestrator, StoredKeyResolver};
use adforge_providers::ProviderRegistry;
use adforge_store::{GenerationRepository, PostgrestClient, ProviderKeyRepository};
use adforge_storage::{AssetPersister, R2Client};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: Arc<Orchestrator>,
    pub storage: Arc<R2Client>,
    pub jobs: GenerationRepository,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let postgrest = PostgrestClient::from_env()?;
        let jobs = GenerationRepository::new(postgrest.clone());
        let keys = ProviderKeyRepository::new(postgrest);

        let storage = Arc::new(R2Client::from_env().await?);
        let persister = AssetPersister::new(R2Client::clone(&storage))?;

        let registry = Arc::new(ProviderRegistry::from_env());

        let orchestrator = Orchestrator::new(
            registry,
            Arc::new(jobs.clone()),
            Arc::new(persister),
            Arc::new(StoredKeyResolver::new(keys)),
            EngineConfig::from_env(),
        );

        Ok(Self {
            config,
            orchestrator: Arc::new(orchestrator),
            storage,
            jobs,
        })
    }
}
