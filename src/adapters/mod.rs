//! The adapter contract: one implementation per source platform.

mod credentials;
mod registry;

pub use credentials::CredentialStore;
pub use registry::{AdapterRegistry, LoggingObserver, RegistryObserver};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::app::{EstuaryError, Result};
use crate::manifest::{ContentManifest, ContentType};
use crate::schema::SettingsSchema;

/// How an adapter authenticates against its platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    #[serde(rename = "oauth")]
    OAuth,
    ApiKey,
    FileUpload,
    Scrape,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::OAuth => "oauth",
            AuthType::ApiKey => "api_key",
            AuthType::FileUpload => "file_upload",
            AuthType::Scrape => "scrape",
        }
    }
}

/// A source platform integration.
///
/// Implementations own the full import surface for one platform: describing
/// their settings, holding their credentials, enumerating available content
/// as a [`ContentManifest`], and fetching raw items for normalization.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Stable identifier, unique across the registry.
    fn id(&self) -> &str;

    /// Human-readable platform name.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Icon identifier for the host UI.
    fn icon(&self) -> &str;

    fn auth_type(&self) -> AuthType;

    /// Validate and store credentials; returns whether they worked.
    async fn authenticate(&self, credentials: &Map<String, Value>) -> Result<bool>;

    fn is_authenticated(&self) -> bool;

    /// Drop stored credentials and any cached platform state.
    async fn disconnect(&self) -> Result<()>;

    /// Enumerate all importable content as a manifest.
    ///
    /// Fails with [`EstuaryError::AuthenticationRequired`] before
    /// [`authenticate`](Self::authenticate) has succeeded.
    ///
    /// [`EstuaryError::AuthenticationRequired`]: crate::app::EstuaryError::AuthenticationRequired
    async fn fetch_manifest(&self) -> Result<ContentManifest>;

    /// Fetch one raw item by its platform ID. Requires authentication like
    /// [`fetch_manifest`](Self::fetch_manifest).
    async fn fetch_item(&self, id: &str) -> Result<Map<String, Value>>;

    fn settings_schema(&self) -> SettingsSchema;

    fn supported_content_types(&self) -> Vec<ContentType>;
}

impl std::fmt::Debug for dyn Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter").field("id", &self.id()).finish()
    }
}

/// Guard for fetch operations.
///
/// Implementations call this at the top of
/// [`fetch_manifest`](Adapter::fetch_manifest) and
/// [`fetch_item`](Adapter::fetch_item) so an unauthenticated call fails
/// loudly instead of returning empty data.
pub fn ensure_authenticated(adapter: &dyn Adapter) -> Result<()> {
    if adapter.is_authenticated() {
        Ok(())
    } else {
        Err(EstuaryError::AuthenticationRequired(
            adapter.id().to_string(),
        ))
    }
}

/// Serializable snapshot of an adapter's public surface.
#[derive(Debug, Clone, Serialize)]
pub struct AdapterDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub auth_type: AuthType,
    pub is_authenticated: bool,
    pub content_types: Vec<ContentType>,
}

impl AdapterDescriptor {
    pub fn from_adapter(adapter: &dyn Adapter) -> Self {
        Self {
            id: adapter.id().to_string(),
            name: adapter.name().to_string(),
            description: adapter.description().to_string(),
            icon: adapter.icon().to_string(),
            auth_type: adapter.auth_type(),
            is_authenticated: adapter.is_authenticated(),
            content_types: adapter.supported_content_types(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct GatedAdapter {
        authenticated: AtomicBool,
    }

    impl GatedAdapter {
        fn new() -> Self {
            Self {
                authenticated: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Adapter for GatedAdapter {
        fn id(&self) -> &str {
            "gated"
        }

        fn name(&self) -> &str {
            "Gated"
        }

        fn description(&self) -> &str {
            "Requires credentials before fetching"
        }

        fn icon(&self) -> &str {
            "lock"
        }

        fn auth_type(&self) -> AuthType {
            AuthType::ApiKey
        }

        async fn authenticate(&self, credentials: &Map<String, Value>) -> Result<bool> {
            let ok = credentials.get("api_key").and_then(Value::as_str).is_some();
            self.authenticated.store(ok, Ordering::SeqCst);
            Ok(ok)
        }

        fn is_authenticated(&self) -> bool {
            self.authenticated.load(Ordering::SeqCst)
        }

        async fn disconnect(&self) -> Result<()> {
            self.authenticated.store(false, Ordering::SeqCst);
            Ok(())
        }

        async fn fetch_manifest(&self) -> Result<ContentManifest> {
            ensure_authenticated(self)?;
            Ok(ContentManifest::new(self.id()))
        }

        async fn fetch_item(&self, _id: &str) -> Result<Map<String, Value>> {
            ensure_authenticated(self)?;
            Ok(Map::new())
        }

        fn settings_schema(&self) -> SettingsSchema {
            SettingsSchema::new()
        }

        fn supported_content_types(&self) -> Vec<ContentType> {
            vec![ContentType::Post]
        }
    }

    fn credentials() -> Map<String, Value> {
        json!({"api_key": "k"}).as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_fetch_fails_before_authentication() {
        let adapter = GatedAdapter::new();

        let err = adapter.fetch_manifest().await.unwrap_err();
        assert!(matches!(
            err,
            EstuaryError::AuthenticationRequired(id) if id == "gated"
        ));
        assert_eq!(
            adapter.fetch_item("1").await.unwrap_err().to_string(),
            "Adapter \"gated\" is not authenticated"
        );
    }

    #[tokio::test]
    async fn test_fetch_succeeds_after_authentication() {
        let adapter = GatedAdapter::new();
        assert!(adapter.authenticate(&credentials()).await.unwrap());

        assert_eq!(adapter.fetch_manifest().await.unwrap().source_id(), "gated");
        adapter.fetch_item("1").await.unwrap();
    }

    #[tokio::test]
    async fn test_disconnect_restores_the_gate() {
        let adapter = GatedAdapter::new();
        adapter.authenticate(&credentials()).await.unwrap();
        adapter.disconnect().await.unwrap();
        assert!(adapter.fetch_manifest().await.is_err());
    }

    #[test]
    fn test_auth_type_tags() {
        assert_eq!(AuthType::OAuth.as_str(), "oauth");
        assert_eq!(AuthType::ApiKey.as_str(), "api_key");
        assert_eq!(
            serde_json::to_value(AuthType::FileUpload).unwrap(),
            serde_json::json!("file_upload")
        );
    }
}
