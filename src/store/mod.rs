//! Persistence seams for credentials and cached API responses.
//!
//! The traits keep the rest of the crate independent of the host
//! application's storage; the in-memory implementations back tests and
//! one-shot CLI runs.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::app::Result;

/// Durable key-value storage for adapter state and credentials.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// Expiring storage for fetched API payloads.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.lock().expect("store lock poisoned");
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.lock().expect("store lock poisoned");
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().expect("store lock poisoned");
        entries.remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Value, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.remove(key);
        Ok(())
    }
}
