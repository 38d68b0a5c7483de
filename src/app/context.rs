use std::sync::Arc;

use crate::adapters::{AdapterRegistry, CredentialStore, LoggingObserver};
use crate::app::Result;
use crate::fetcher::{HttpClient, ReqwestClient};
use crate::normalizer::{DateConverter, GenericNormalizer, HtmlSanitizer};
use crate::store::{Cache, KeyValueStore, MemoryCache, MemoryStore};

const CREDENTIAL_PREFIX: &str = "estuary_credentials";

/// Shared services handed to adapters and commands.
///
/// Built once at startup; everything inside is cheap to clone through the
/// wrapping [`Arc`]s.
pub struct AppContext {
    pub registry: Arc<AdapterRegistry>,
    pub store: Arc<dyn KeyValueStore>,
    pub cache: Arc<dyn Cache>,
    pub http: Arc<dyn HttpClient>,
    pub sanitizer: HtmlSanitizer,
    pub dates: DateConverter,
}

impl AppContext {
    pub fn new() -> Result<Self> {
        Ok(Self {
            registry: Arc::new(
                AdapterRegistry::new().with_observer(Arc::new(LoggingObserver)),
            ),
            store: Arc::new(MemoryStore::new()),
            cache: Arc::new(MemoryCache::new()),
            http: Arc::new(ReqwestClient::new()?),
            sanitizer: HtmlSanitizer::new(),
            dates: DateConverter::new(),
        })
    }

    /// Credential storage scoped to one adapter.
    pub fn credentials_for(&self, adapter_id: &str) -> CredentialStore {
        CredentialStore::new(self.store.clone(), CREDENTIAL_PREFIX, adapter_id)
    }

    /// Fallback normalizer for adapters without a platform-specific one.
    pub fn normalizer_for(&self, adapter_id: &str) -> GenericNormalizer {
        GenericNormalizer::with_components(
            adapter_id,
            self.sanitizer.clone(),
            self.dates.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_wires_shared_services() {
        let ctx = AppContext::new().unwrap();
        assert!(ctx.registry.is_empty());

        let credentials = ctx.credentials_for("twitter");
        assert_eq!(
            credentials.cache_key("manifest"),
            "estuary_credentials_twitter_manifest"
        );
    }
}
