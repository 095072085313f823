//! Backend adapter contract
//!
//! Every physical storage target implements [`ArtifactBackend`]. All
//! orchestration above this layer (listing, scoring, promotion) is written
//! once against the trait.

use crate::error::BackendError;
use crate::progress::ProgressSink;
use deck_artifact::{BackendId, Namespace, Payload};
use std::sync::Arc;

/// Uniform CRUD surface over one storage target
///
/// Operations are scoped to a [`Namespace`]; a backend that has no location
/// for a namespace returns [`BackendError::Unsupported`] and reports `false`
/// from [`supports`](Self::supports).
#[async_trait::async_trait]
pub trait ArtifactBackend: Send + Sync {
    /// Stable identifier used to route follow-up operations
    fn id(&self) -> BackendId;

    /// Whether this backend holds the namespace at all
    fn supports(&self, namespace: Namespace) -> bool;

    /// Names currently stored in the namespace
    async fn list(&self, namespace: Namespace) -> Result<Vec<String>, BackendError>;

    /// Payload of one artifact; [`BackendError::NotFound`] if absent
    async fn get(&self, namespace: Namespace, name: &str) -> Result<Payload, BackendError>;

    /// Create or overwrite an artifact (last writer wins)
    async fn put(&self, namespace: Namespace, name: &str, payload: Payload)
        -> Result<(), BackendError>;

    /// Same as [`put`](Self::put), reporting bytes sent along the way
    ///
    /// Backends that cannot observe the transfer report the start and the
    /// end only.
    async fn put_with_progress(
        &self,
        namespace: Namespace,
        name: &str,
        payload: Payload,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<(), BackendError> {
        let total = payload.len() as u64;
        progress.report(0, total);
        self.put(namespace, name, payload).await?;
        progress.report(total, total);
        Ok(())
    }

    /// Remove one artifact; [`BackendError::NotFound`] if absent
    async fn delete(&self, namespace: Namespace, name: &str) -> Result<(), BackendError>;

    /// Remove every artifact in the namespace and return how many were removed
    ///
    /// An empty namespace yields `Ok(0)`.
    async fn delete_all(&self, namespace: Namespace) -> Result<usize, BackendError>;
}

/// Shared handle to a registered backend
pub type SharedBackend = Arc<dyn ArtifactBackend>;
