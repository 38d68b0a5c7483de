use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use tracing::info;

use crate::adapters::{Adapter, AdapterDescriptor, AuthType};
use crate::app::{EstuaryError, Result};

/// Hook for reacting to registry membership changes.
pub trait RegistryObserver: Send + Sync {
    fn adapter_registered(&self, id: &str);
    fn adapter_unregistered(&self, id: &str);
}

/// Default observer that records membership changes in the log.
pub struct LoggingObserver;

impl RegistryObserver for LoggingObserver {
    fn adapter_registered(&self, id: &str) {
        info!(adapter = id, "adapter registered");
    }

    fn adapter_unregistered(&self, id: &str) {
        info!(adapter = id, "adapter unregistered");
    }
}

/// Central collection of the adapters available to the application.
///
/// Registration order is preserved; IDs are unique and a second
/// registration under an existing ID is rejected with the first intact.
pub struct AdapterRegistry {
    inner: RwLock<IndexMap<String, Arc<dyn Adapter>>>,
    observers: Vec<Arc<dyn RegistryObserver>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(IndexMap::new()),
            observers: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RegistryObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn register(&self, adapter: Arc<dyn Adapter>) -> Result<()> {
        let id = adapter.id().to_string();
        {
            let mut inner = self.inner.write().expect("registry lock poisoned");
            if inner.contains_key(&id) {
                return Err(EstuaryError::DuplicateAdapter(id));
            }
            inner.insert(id.clone(), adapter);
        }

        for observer in &self.observers {
            observer.adapter_registered(&id);
        }
        Ok(())
    }

    /// Remove an adapter; returns whether it was present.
    pub fn unregister(&self, id: &str) -> bool {
        let removed = {
            let mut inner = self.inner.write().expect("registry lock poisoned");
            inner.shift_remove(id).is_some()
        };

        if removed {
            for observer in &self.observers {
                observer.adapter_unregistered(id);
            }
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Adapter>> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.get(id).cloned()
    }

    /// Like [`get`](Self::get), but an unknown ID is an error.
    pub fn require(&self, id: &str) -> Result<Arc<dyn Adapter>> {
        self.get(id)
            .ok_or_else(|| EstuaryError::AdapterNotFound(id.to_string()))
    }

    pub fn has(&self, id: &str) -> bool {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.contains_key(id)
    }

    /// All adapters in registration order.
    pub fn all(&self) -> Vec<Arc<dyn Adapter>> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.values().cloned().collect()
    }

    pub fn ids(&self) -> Vec<String> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.keys().cloned().collect()
    }

    pub fn authenticated(&self) -> Vec<Arc<dyn Adapter>> {
        self.all()
            .into_iter()
            .filter(|a| a.is_authenticated())
            .collect()
    }

    pub fn by_auth_type(&self, auth_type: AuthType) -> Vec<Arc<dyn Adapter>> {
        self.all()
            .into_iter()
            .filter(|a| a.auth_type() == auth_type)
            .collect()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn descriptors(&self) -> Vec<AdapterDescriptor> {
        self.all()
            .iter()
            .map(|a| AdapterDescriptor::from_adapter(a.as_ref()))
            .collect()
    }

    /// Remove every adapter, notifying observers for each.
    pub fn reset(&self) {
        let ids: Vec<String> = {
            let mut inner = self.inner.write().expect("registry lock poisoned");
            inner.drain(..).map(|(id, _)| id).collect()
        };

        for id in &ids {
            for observer in &self.observers {
                observer.adapter_unregistered(id);
            }
        }
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
