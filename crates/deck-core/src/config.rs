//! Process configuration
//!
//! Built once at startup (TOML file, then environment overrides) and passed
//! into adapter constructors. There is no global handle.
//!
//! ```toml
//! fanout_limit = 8
//! promotion_target = "object-store"
//!
//! [artifact_server]
//! base_url = "http://localhost:5000"
//!
//! [object_store]
//! endpoint = "https://firebasestorage.googleapis.com"
//! bucket = "decks"
//! ```

use crate::analysis::AnalysisClient;
use crate::error::{CoreError, Result};
use crate::repository::{ArtifactRepository, DEFAULT_FANOUT_LIMIT};
use deck_artifact::BackendId;
use deck_store::{HttpBackend, ObjectStoreBackend};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default request timeout for storage backends
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding the artifact server URL
pub const ENV_SERVER_URL: &str = "DECK_SERVER_URL";
/// Environment variable overriding the object store endpoint
pub const ENV_OBJECT_ENDPOINT: &str = "DECK_OBJECT_ENDPOINT";
/// Environment variable overriding the object store bucket
pub const ENV_OBJECT_BUCKET: &str = "DECK_OBJECT_BUCKET";
/// Environment variable holding the object store bearer token
pub const ENV_OBJECT_TOKEN: &str = "DECK_OBJECT_TOKEN";

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Remote artifact server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactServerConfig {
    /// Server root, e.g. `http://localhost:5000`
    pub base_url: String,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Hosted object store bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    /// API root
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Optional bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Deck pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    /// Artifact server, if used
    pub artifact_server: Option<ArtifactServerConfig>,
    /// Object store, if used
    pub object_store: Option<ObjectStoreConfig>,
    /// Max concurrent per-item sub-operations
    pub fanout_limit: usize,
    /// Backend receiving promoted uploads
    pub promotion_target: BackendId,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            artifact_server: None,
            object_store: None,
            fanout_limit: DEFAULT_FANOUT_LIMIT,
            promotion_target: BackendId::object_store(),
        }
    }
}

impl DeckConfig {
    /// Create default configuration (no backends)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With artifact server
    #[must_use]
    pub fn with_artifact_server(mut self, base_url: impl Into<String>) -> Self {
        self.artifact_server = Some(ArtifactServerConfig {
            base_url: base_url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        });
        self
    }

    /// With object store
    #[must_use]
    pub fn with_object_store(mut self, endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        self.object_store = Some(ObjectStoreConfig {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            bearer_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        });
        self
    }

    /// With fanout limit
    #[inline]
    #[must_use]
    pub fn with_fanout_limit(mut self, limit: usize) -> Self {
        self.fanout_limit = limit;
        self
    }

    /// With promotion target
    #[inline]
    #[must_use]
    pub fn with_promotion_target(mut self, target: BackendId) -> Self {
        self.promotion_target = target;
        self
    }

    /// Parse TOML
    ///
    /// # Errors
    /// [`CoreError::Config`] on syntax or type errors
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// [`CoreError::Config`] if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "loading config");
        Self::from_toml_str(&text)
    }

    /// Apply `DECK_*` environment overrides
    #[must_use]
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    ///
    /// A server URL alone creates the server section; an object store section
    /// is created only when both endpoint and bucket are supplied.
    #[must_use]
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(base_url) = get(ENV_SERVER_URL) {
            let timeout_secs = self
                .artifact_server
                .as_ref()
                .map_or(DEFAULT_TIMEOUT_SECS, |s| s.timeout_secs);
            self.artifact_server = Some(ArtifactServerConfig {
                base_url,
                timeout_secs,
            });
        }

        self.object_store = match (self.object_store.take(), get(ENV_OBJECT_ENDPOINT), get(ENV_OBJECT_BUCKET)) {
            (Some(mut store), endpoint, bucket) => {
                if let Some(endpoint) = endpoint {
                    store.endpoint = endpoint;
                }
                if let Some(bucket) = bucket {
                    store.bucket = bucket;
                }
                Some(store)
            }
            (None, Some(endpoint), Some(bucket)) => Some(ObjectStoreConfig {
                endpoint,
                bucket,
                bearer_token: None,
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            }),
            (None, _, _) => None,
        };

        if let (Some(store), Some(token)) = (self.object_store.as_mut(), get(ENV_OBJECT_TOKEN)) {
            store.bearer_token = Some(token);
        }
        self
    }

    /// Check the configuration is usable
    ///
    /// # Errors
    /// [`CoreError::Config`] when no backend is configured, the fanout limit
    /// is zero, or the promotion target is not a configured backend
    pub fn validate(&self) -> Result<()> {
        if self.artifact_server.is_none() && self.object_store.is_none() {
            return Err(CoreError::Config("no backend configured".into()));
        }
        if self.fanout_limit == 0 {
            return Err(CoreError::Config("fanout_limit must be at least 1".into()));
        }
        let target_configured = (self.promotion_target == BackendId::artifact_server()
            && self.artifact_server.is_some())
            || (self.promotion_target == BackendId::object_store() && self.object_store.is_some());
        if !target_configured {
            return Err(CoreError::Config(format!(
                "promotion_target '{}' is not a configured backend",
                self.promotion_target
            )));
        }
        Ok(())
    }

    /// Construct adapters and the repository
    ///
    /// The artifact server is registered first, so lookups across backends
    /// try it first.
    ///
    /// # Errors
    /// Validation errors, or an adapter that cannot be constructed
    pub fn build_repository(&self) -> Result<ArtifactRepository> {
        self.validate()?;
        let mut repository = ArtifactRepository::new().with_fanout_limit(self.fanout_limit);

        if let Some(server) = &self.artifact_server {
            let backend = HttpBackend::new(&server.base_url, Duration::from_secs(server.timeout_secs))?;
            repository = repository.with_backend(Arc::new(backend));
        }
        if let Some(store) = &self.object_store {
            let backend = ObjectStoreBackend::new(
                &store.endpoint,
                store.bucket.clone(),
                Duration::from_secs(store.timeout_secs),
            )?
            .with_bearer_token(store.bearer_token.clone())
            .with_delete_concurrency(self.fanout_limit);
            repository = repository.with_backend(Arc::new(backend));
        }
        Ok(repository)
    }

    /// Client for the analysis endpoints, when an artifact server is configured
    ///
    /// # Errors
    /// [`CoreError::Config`] for an unusable server URL
    pub fn analysis_client(&self, timeout: Duration) -> Result<Option<AnalysisClient>> {
        self.artifact_server
            .as_ref()
            .map(|server| AnalysisClient::new(&server.base_url, timeout))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn parses_full_file() {
        let config = DeckConfig::from_toml_str(
            r#"
            fanout_limit = 4
            promotion_target = "server"

            [artifact_server]
            base_url = "http://localhost:5000"

            [object_store]
            endpoint = "https://storage.example.com"
            bucket = "decks"
            timeout_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.fanout_limit, 4);
        assert_eq!(config.promotion_target, BackendId::artifact_server());
        assert_eq!(config.artifact_server.as_ref().unwrap().timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.object_store.as_ref().unwrap().timeout_secs, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = DeckConfig::from_toml_str("").unwrap();
        assert_eq!(config, DeckConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_SERVER_URL, "http://server:5000"),
            (ENV_OBJECT_ENDPOINT, "http://gcs:4443"),
            (ENV_OBJECT_BUCKET, "decks"),
            (ENV_OBJECT_TOKEN, "t0ken"),
        ]
        .into_iter()
        .collect();

        let config = DeckConfig::new().apply_overrides(|k| env.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.artifact_server.unwrap().base_url, "http://server:5000");
        let store = config.object_store.unwrap();
        assert_eq!(store.endpoint, "http://gcs:4443");
        assert_eq!(store.bearer_token.as_deref(), Some("t0ken"));
    }

    #[test]
    fn partial_object_store_override_is_ignored() {
        let config = DeckConfig::new().apply_overrides(|k| (k == ENV_OBJECT_BUCKET).then(|| "decks".to_string()));
        assert!(config.object_store.is_none());
    }

    #[test]
    fn promotion_target_must_be_configured() {
        let config = DeckConfig::new().with_artifact_server("http://localhost:5000");
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
        assert!(config
            .with_promotion_target(BackendId::artifact_server())
            .validate()
            .is_ok());
    }

    #[test]
    fn zero_fanout_rejected() {
        let config = DeckConfig::new()
            .with_object_store("http://gcs", "decks")
            .with_fanout_limit(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn builds_repository_in_registration_order() {
        let repo = DeckConfig::new()
            .with_artifact_server("http://localhost:5000")
            .with_object_store("http://localhost:4443", "decks")
            .build_repository()
            .unwrap();
        assert_eq!(
            repo.backend_ids(),
            vec![BackendId::artifact_server(), BackendId::object_store()]
        );
    }
}
