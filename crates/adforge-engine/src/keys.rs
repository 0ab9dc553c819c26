//! Vendor API key resolution.
//!
//! Keys come from the org's stored credentials first, then from the
//! process environment as a platform-wide fallback.

use async_trait::async_trait;
use tracing::debug;

use adforge_models::ProviderId;
use adforge_store::ProviderKeyRepository;

use crate::error::{EngineError, EngineResult};
use crate::traits::KeyResolver;

/// Resolver backed by the `org_provider_keys` table with an env fallback.
pub struct StoredKeyResolver {
    keys: ProviderKeyRepository,
}

impl StoredKeyResolver {
    pub fn new(keys: ProviderKeyRepository) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl KeyResolver for StoredKeyResolver {
    async fn resolve(&self, org_id: &str, provider: ProviderId) -> EngineResult<String> {
        if let Some(key) = self.keys.get(org_id, provider).await? {
            debug!(org_id, %provider, "Using org-scoped provider key");
            return Ok(key);
        }

        env_key(provider).ok_or(EngineError::MissingApiKey {
            provider,
            org_id: org_id.to_string(),
        })
    }
}

/// Resolver that only reads process environment variables. Used by
/// deployments without per-org credentials.
pub struct EnvKeyResolver;

#[async_trait]
impl KeyResolver for EnvKeyResolver {
    async fn resolve(&self, org_id: &str, provider: ProviderId) -> EngineResult<String> {
        env_key(provider).ok_or(EngineError::MissingApiKey {
            provider,
            org_id: org_id.to_string(),
        })
    }
}

fn env_key(provider: ProviderId) -> Option<String> {
    std::env::var(provider.env_key_var())
        .ok()
        .filter(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_env_resolver_missing_key() {
        std::env::remove_var(ProviderId::Kling.env_key_var());
        let err = EnvKeyResolver
            .resolve("org-1", ProviderId::Kling)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingApiKey { .. }));
    }
}
