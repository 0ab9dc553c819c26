//! Provider lookup by id or model alias.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use adforge_models::ProviderId;

use crate::adapter::{GenerationProvider, ProviderOptions};
use crate::error::{ProviderError, ProviderResult};
use crate::fake::FakeProvider;
use crate::gemini::GeminiImageProvider;
use crate::kling::KlingProvider;
use crate::runway::RunwayProvider;
use crate::sora::SoraProvider;
use crate::veo::VeoProvider;

/// Immutable set of registered provider adapters.
///
/// Built once at process start and shared behind an `Arc`. Lookup accepts
/// either a provider id ("sora") or one of the adapter's model aliases
/// ("sora-2-pro").
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn GenerationProvider>>,
    aliases: HashMap<&'static str, ProviderId>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Register an adapter under its own id and model aliases.
    ///
    /// Registering the same id twice replaces the earlier adapter.
    pub fn register(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        for alias in provider.model_aliases() {
            self.aliases.insert(alias, provider.id());
        }
        self.providers.insert(provider.id(), provider);
        self
    }

    /// Registry with every real vendor adapter.
    ///
    /// The fake provider is added separately when PROVIDER_ENABLE_FAKE is
    /// set; it never ships in the default set.
    pub fn with_vendors(options: &ProviderOptions) -> Self {
        let registry = Self::new()
            .register(Arc::new(SoraProvider::new(options)))
            .register(Arc::new(VeoProvider::new(options)))
            .register(Arc::new(RunwayProvider::new(options)))
            .register(Arc::new(KlingProvider::new(options)))
            .register(Arc::new(GeminiImageProvider::new(options)));

        info!(
            providers = registry.providers.len(),
            mock_fallback = options.mock_fallback,
            "Provider registry initialized"
        );
        registry
    }

    /// Registry built from the environment: all vendors, plus the fake
    /// provider when PROVIDER_ENABLE_FAKE is truthy.
    pub fn from_env() -> Self {
        let options = ProviderOptions::from_env();
        let mut registry = Self::with_vendors(&options);

        let enable_fake = std::env::var("PROVIDER_ENABLE_FAKE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        if enable_fake {
            registry = registry.register(Arc::new(FakeProvider::new()));
        }
        registry
    }

    /// Look up an adapter by id.
    pub fn get(&self, id: ProviderId) -> ProviderResult<Arc<dyn GenerationProvider>> {
        self.providers
            .get(&id)
            .cloned()
            .ok_or_else(|| self.unknown(id.as_str()))
    }

    /// Look up an adapter by provider id string or model alias.
    pub fn resolve(&self, name: &str) -> ProviderResult<Arc<dyn GenerationProvider>> {
        if let Ok(id) = name.parse::<ProviderId>() {
            if let Some(provider) = self.providers.get(&id) {
                return Ok(provider.clone());
            }
        }
        if let Some(id) = self.aliases.get(name) {
            if let Some(provider) = self.providers.get(id) {
                return Ok(provider.clone());
            }
        }
        Err(self.unknown(name))
    }

    /// Ids registered, in no particular order.
    pub fn ids(&self) -> Vec<ProviderId> {
        self.providers.keys().copied().collect()
    }

    fn unknown(&self, given: &str) -> ProviderError {
        let mut valid: Vec<&str> = self.providers.keys().map(|id| id.as_str()).collect();
        valid.sort_unstable();
        ProviderError::UnknownProvider {
            given: given.to_string(),
            valid: valid.join(", "),
        }
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vendors_registered() {
        let registry = ProviderRegistry::with_vendors(&ProviderOptions::default());
        for id in ProviderId::vendors() {
            let provider = registry.get(*id).unwrap();
            assert_eq!(provider.id(), *id);
        }
    }

    #[test]
    fn test_fake_not_in_default_set() {
        let registry = ProviderRegistry::with_vendors(&ProviderOptions::default());
        assert!(registry.get(ProviderId::Fake).is_err());
    }

    #[test]
    fn test_resolve_by_model_alias() {
        let registry = ProviderRegistry::with_vendors(&ProviderOptions::default());
        let provider = registry.resolve("gen4_turbo").unwrap();
        assert_eq!(provider.id(), ProviderId::Runway);
    }

    #[test]
    fn test_unknown_provider_lists_valid_ids() {
        let registry = ProviderRegistry::with_vendors(&ProviderOptions::default());
        let err = registry.resolve("midjourney").err().unwrap();
        match err {
            ProviderError::UnknownProvider { given, valid } => {
                assert_eq!(given, "midjourney");
                assert!(valid.contains("sora"));
                assert!(valid.contains("kling"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_register_replaces_existing() {
        let options = ProviderOptions::default();
        let registry = ProviderRegistry::new()
            .register(Arc::new(SoraProvider::new(&options)))
            .register(Arc::new(SoraProvider::new(&options)));
        assert_eq!(registry.ids().len(), 1);
    }
}
