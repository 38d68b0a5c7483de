use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tracing::debug;

use crate::app::Result;
use crate::store::KeyValueStore;

/// Per-adapter credential persistence with an in-process cache.
///
/// Credentials live under `{prefix}_{adapter_id}` in the backing store so
/// multiple deployments can share one store without collisions.
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
    adapter_id: String,
    cached: Mutex<Option<Map<String, Value>>>,
}

impl CredentialStore {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        prefix: impl Into<String>,
        adapter_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            adapter_id: adapter_id.into(),
            cached: Mutex::new(None),
        }
    }

    fn storage_key(&self) -> String {
        format!("{}_{}", self.prefix, self.adapter_id)
    }

    /// Namespaced key for adapter-scoped auxiliary data.
    pub fn cache_key(&self, suffix: &str) -> String {
        format!("{}_{}_{}", self.prefix, self.adapter_id, suffix)
    }

    /// Stored credentials, or an empty map when none were saved.
    pub fn load(&self) -> Result<Map<String, Value>> {
        {
            let cached = self.cached.lock().expect("credential cache poisoned");
            if let Some(credentials) = cached.as_ref() {
                return Ok(credentials.clone());
            }
        }

        let credentials = match self.store.get(&self.storage_key())? {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };

        let mut cached = self.cached.lock().expect("credential cache poisoned");
        *cached = Some(credentials.clone());
        Ok(credentials)
    }

    pub fn save(&self, credentials: Map<String, Value>) -> Result<()> {
        debug!(adapter = %self.adapter_id, "saving credentials");
        self.store
            .set(&self.storage_key(), Value::Object(credentials.clone()))?;
        let mut cached = self.cached.lock().expect("credential cache poisoned");
        *cached = Some(credentials);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        debug!(adapter = %self.adapter_id, "clearing credentials");
        self.store.delete(&self.storage_key())?;
        let mut cached = self.cached.lock().expect("credential cache poisoned");
        *cached = None;
        Ok(())
    }

    pub fn has_credentials(&self) -> bool {
        self.load().map(|c| !c.is_empty()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn store_pair() -> (Arc<MemoryStore>, CredentialStore) {
        let backing = Arc::new(MemoryStore::new());
        let credentials =
            CredentialStore::new(backing.clone(), "estuary_credentials", "twitter");
        (backing, credentials)
    }

    fn sample() -> Map<String, Value> {
        json!({"api_key": "secret"})
            .as_object()
            .unwrap()
            .clone()
    }

    #[test]
    fn test_key_namespacing() {
        let (_, credentials) = store_pair();
        assert_eq!(credentials.cache_key("manifest"), "estuary_credentials_twitter_manifest");
    }

    #[test]
    fn test_save_load_clear() {
        let (backing, credentials) = store_pair();
        assert!(!credentials.has_credentials());

        credentials.save(sample()).unwrap();
        assert!(credentials.has_credentials());
        assert_eq!(credentials.load().unwrap(), sample());
        assert_eq!(
            backing.get("estuary_credentials_twitter").unwrap(),
            Some(Value::Object(sample()))
        );

        credentials.clear().unwrap();
        assert!(!credentials.has_credentials());
        assert_eq!(credentials.load().unwrap(), Map::new());
    }

    #[test]
    fn test_load_caches_backing_reads() {
        let (backing, credentials) = store_pair();
        credentials.save(sample()).unwrap();

        // A write that bypasses this handle is not seen until the cache is
        // cleared.
        backing
            .set("estuary_credentials_twitter", json!({"api_key": "other"}))
            .unwrap();
        assert_eq!(credentials.load().unwrap(), sample());

        credentials.clear().unwrap();
        assert_eq!(credentials.load().unwrap(), Map::new());
    }

    #[test]
    fn test_adapters_do_not_collide() {
        let backing = Arc::new(MemoryStore::new());
        let twitter = CredentialStore::new(backing.clone(), "p", "twitter");
        let medium = CredentialStore::new(backing, "p", "medium");

        twitter.save(sample()).unwrap();
        assert!(!medium.has_credentials());
    }
}
