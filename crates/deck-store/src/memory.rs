//! In-process backend
//!
//! Holds artifacts in a map. Used as a stand-in for either physical backend
//! in tests and for local dry runs.

use crate::backend::ArtifactBackend;
use crate::error::BackendError;
use deck_artifact::{BackendId, Namespace, Payload};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Map-backed [`ArtifactBackend`]
#[derive(Debug)]
pub struct MemoryBackend {
    id: BackendId,
    namespaces: Option<HashSet<Namespace>>,
    objects: Mutex<HashMap<Namespace, BTreeMap<String, Payload>>>,
}

impl MemoryBackend {
    /// Create an empty backend that supports every namespace
    #[must_use]
    pub fn new(id: impl Into<BackendId>) -> Self {
        Self {
            id: id.into(),
            namespaces: None,
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Restrict the namespaces this backend will accept
    #[must_use]
    pub fn with_namespaces(mut self, namespaces: impl IntoIterator<Item = Namespace>) -> Self {
        self.namespaces = Some(namespaces.into_iter().collect());
        self
    }

    /// Seed an artifact
    #[must_use]
    pub fn with_artifact(self, namespace: Namespace, name: &str, payload: impl Into<Payload>) -> Self {
        self.insert(namespace, name, payload);
        self
    }

    /// Insert or overwrite an artifact without going through the async API
    pub fn insert(&self, namespace: Namespace, name: &str, payload: impl Into<Payload>) {
        self.objects
            .lock()
            .entry(namespace)
            .or_default()
            .insert(name.to_string(), payload.into());
    }

    /// Whether an artifact exists
    #[must_use]
    pub fn contains(&self, namespace: Namespace, name: &str) -> bool {
        self.objects
            .lock()
            .get(&namespace)
            .is_some_and(|m| m.contains_key(name))
    }

    /// Copy of one namespace's contents
    #[must_use]
    pub fn snapshot(&self, namespace: Namespace) -> BTreeMap<String, Payload> {
        self.objects.lock().get(&namespace).cloned().unwrap_or_default()
    }

    fn check(&self, namespace: Namespace) -> Result<(), BackendError> {
        if self.supports(namespace) {
            Ok(())
        } else {
            Err(BackendError::Unsupported {
                backend: self.id.clone(),
                namespace,
            })
        }
    }
}

#[async_trait::async_trait]
impl ArtifactBackend for MemoryBackend {
    fn id(&self) -> BackendId {
        self.id.clone()
    }

    fn supports(&self, namespace: Namespace) -> bool {
        self.namespaces.as_ref().map_or(true, |set| set.contains(&namespace))
    }

    async fn list(&self, namespace: Namespace) -> Result<Vec<String>, BackendError> {
        self.check(namespace)?;
        Ok(self
            .objects
            .lock()
            .get(&namespace)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, namespace: Namespace, name: &str) -> Result<Payload, BackendError> {
        self.check(namespace)?;
        self.objects
            .lock()
            .get(&namespace)
            .and_then(|m| m.get(name).cloned())
            .ok_or_else(|| BackendError::not_found(namespace, name))
    }

    async fn put(
        &self,
        namespace: Namespace,
        name: &str,
        payload: Payload,
    ) -> Result<(), BackendError> {
        self.check(namespace)?;
        debug!(backend = %self.id, %namespace, name, bytes = payload.len(), "put");
        self.insert(namespace, name, payload);
        Ok(())
    }

    async fn delete(&self, namespace: Namespace, name: &str) -> Result<(), BackendError> {
        self.check(namespace)?;
        self.objects
            .lock()
            .get_mut(&namespace)
            .and_then(|m| m.remove(name))
            .map(|_| ())
            .ok_or_else(|| BackendError::not_found(namespace, name))
    }

    async fn delete_all(&self, namespace: Namespace) -> Result<usize, BackendError> {
        self.check(namespace)?;
        Ok(self
            .objects
            .lock()
            .remove(&namespace)
            .map_or(0, |m| m.len()))
    }
}
