//! One logical view over every registered backend
//!
//! The backends are independent collections, not replicas. Listings are
//! never merged or deduplicated across backends, every follow-up operation is
//! routed to the backend an artifact was listed from, and nothing is cached:
//! each call is a fresh read.

use crate::error::{CoreError, Result};
use deck_artifact::{Artifact, ArtifactKind, ArtifactRef, BackendId, Namespace, Payload, Round};
use deck_store::{BackendError, SharedBackend};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Default bound on concurrent per-item sub-operations
pub const DEFAULT_FANOUT_LIMIT: usize = 8;

/// Names found in one namespace across all backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Namespace that was listed
    pub namespace: Namespace,
    /// One entry per (backend, name); identical names in two backends appear twice
    pub entries: Vec<ArtifactRef>,
    /// Backends whose listing failed
    pub failures: Vec<(BackendId, BackendError)>,
}

impl Listing {
    /// Whether every backend answered
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was found
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries held by one backend
    pub fn from_backend<'a>(&'a self, backend: &'a BackendId) -> impl Iterator<Item = &'a ArtifactRef> {
        self.entries.iter().filter(move |r| &r.backend == backend)
    }
}

/// Per-backend outcome of a bulk delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAllReport {
    /// Namespace that was cleared
    pub namespace: Namespace,
    /// Count deleted, or the failure, for each backend holding the namespace
    pub outcomes: Vec<(BackendId, std::result::Result<usize, BackendError>)>,
}

impl DeleteAllReport {
    /// Whether every backend was cleared
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|(_, r)| r.is_ok())
    }

    /// Sum of artifacts deleted by the backends that succeeded
    #[must_use]
    pub fn total_deleted(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, r)| match r {
                Ok(n) => *n,
                Err(BackendError::Incomplete { deleted, .. }) => *deleted,
                Err(_) => 0,
            })
            .sum()
    }

    /// Backends that failed, with their errors
    pub fn failures(&self) -> impl Iterator<Item = (&BackendId, &BackendError)> {
        self.outcomes
            .iter()
            .filter_map(|(id, r)| r.as_ref().err().map(|e| (id, e)))
    }
}

/// Which backends hold each name of a namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Namespace compared
    pub namespace: Namespace,
    /// Backends that answered
    pub backends: Vec<BackendId>,
    /// Name → backends holding it
    pub holders: BTreeMap<String, BTreeSet<BackendId>>,
    /// Backends whose listing failed
    pub failures: Vec<(BackendId, BackendError)>,
}

impl SyncReport {
    /// Names missing from at least one backend (the symmetric difference)
    pub fn out_of_sync(&self) -> impl Iterator<Item = (&str, &BTreeSet<BackendId>)> {
        let expected = self.backends.len();
        self.holders
            .iter()
            .filter(move |(_, held)| held.len() < expected)
            .map(|(name, held)| (name.as_str(), held))
    }

    /// Names held by one backend and absent from every other
    #[must_use]
    pub fn only_in(&self, backend: &BackendId) -> Vec<&str> {
        self.holders
            .iter()
            .filter(|(_, held)| held.len() == 1 && held.contains(backend))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Whether all answering backends hold the same names
    #[must_use]
    pub fn is_in_sync(&self) -> bool {
        self.out_of_sync().next().is_none()
    }
}

/// Composes the registered backends into one mildly inconsistent view
#[derive(Clone)]
pub struct ArtifactRepository {
    backends: Vec<SharedBackend>,
    fanout_limit: usize,
}

impl std::fmt::Debug for ArtifactRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactRepository")
            .field("backends", &self.backend_ids())
            .field("fanout_limit", &self.fanout_limit)
            .finish()
    }
}

impl Default for ArtifactRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactRepository {
    /// Create repository with no backends
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
            fanout_limit: DEFAULT_FANOUT_LIMIT,
        }
    }

    /// Register a backend; a backend with the same id is replaced
    #[must_use]
    pub fn with_backend(mut self, backend: SharedBackend) -> Self {
        let id = backend.id();
        self.backends.retain(|b| b.id() != id);
        self.backends.push(backend);
        self
    }

    /// Bound concurrent per-item sub-operations
    #[inline]
    #[must_use]
    pub fn with_fanout_limit(mut self, limit: usize) -> Self {
        self.fanout_limit = limit.max(1);
        self
    }

    /// Concurrency bound used by bulk operations
    #[inline]
    #[must_use]
    pub fn fanout_limit(&self) -> usize {
        self.fanout_limit
    }

    /// Registered backend ids in registration order
    #[must_use]
    pub fn backend_ids(&self) -> Vec<BackendId> {
        self.backends.iter().map(|b| b.id()).collect()
    }

    /// Backend by id
    #[must_use]
    pub fn backend(&self, id: &BackendId) -> Option<&SharedBackend> {
        self.backends.iter().find(|b| &b.id() == id)
    }

    /// Backends that hold a namespace, in registration order
    #[must_use]
    pub fn backends_for(&self, namespace: Namespace) -> Vec<&SharedBackend> {
        self.backends.iter().filter(|b| b.supports(namespace)).collect()
    }

    fn route(&self, namespace: Namespace, backend: &BackendId) -> Result<&SharedBackend> {
        self.backend(backend)
            .filter(|b| b.supports(namespace))
            .ok_or_else(|| CoreError::NoBackend {
                namespace,
                backend: backend.clone(),
            })
    }

    async fn list_each(
        &self,
        namespace: Namespace,
    ) -> Vec<(BackendId, std::result::Result<Vec<String>, BackendError>)> {
        stream::iter(self.backends_for(namespace))
            .map(|backend| async move { (backend.id(), backend.list(namespace).await) })
            .buffered(self.fanout_limit)
            .collect()
            .await
    }

    /// List a namespace on every backend concurrently
    ///
    /// A backend that fails to list is reported in [`Listing::failures`]; the
    /// other backends' entries are still returned.
    pub async fn list_all(&self, kind: ArtifactKind, round: Round) -> Listing {
        let namespace = Namespace::new(kind, round);
        let mut listing = Listing {
            namespace,
            entries: Vec::new(),
            failures: Vec::new(),
        };

        for (backend, result) in self.list_each(namespace).await {
            match result {
                Ok(names) => listing.entries.extend(
                    names
                        .into_iter()
                        .map(|name| ArtifactRef::new(namespace, backend.clone(), name)),
                ),
                Err(e) => {
                    warn!(%backend, %namespace, error = %e, "listing failed");
                    listing.failures.push((backend, e));
                }
            }
        }

        debug!(%namespace, count = listing.len(), "listed all backends");
        listing
    }

    /// Read one artifact from the named backend
    ///
    /// # Errors
    /// [`CoreError::NoBackend`] if the backend is not registered for the
    /// namespace; backend errors (including NotFound) otherwise.
    pub async fn fetch(&self, kind: ArtifactKind, round: Round, name: &str, backend: &BackendId) -> Result<Artifact> {
        self.fetch_ref(&ArtifactRef::new(Namespace::new(kind, round), backend.clone(), name))
            .await
    }

    /// Read the artifact a reference points at
    ///
    /// # Errors
    /// See [`fetch`](Self::fetch)
    pub async fn fetch_ref(&self, reference: &ArtifactRef) -> Result<Artifact> {
        let backend = self.route(reference.namespace, &reference.backend)?;
        let payload = backend.get(reference.namespace, &reference.name).await?;
        Ok(Artifact::new(reference.clone(), payload))
    }

    /// First copy of a name found in any backend, in registration order
    ///
    /// Absence everywhere yields `Ok(None)`; any other failure is returned.
    ///
    /// # Errors
    /// The first non-NotFound backend error, if no backend held the name
    pub async fn find(&self, namespace: Namespace, name: &str) -> Result<Option<Artifact>> {
        let mut last_error = None;
        for backend in self.backends_for(namespace) {
            match backend.get(namespace, name).await {
                Ok(payload) => {
                    return Ok(Some(Artifact::new(
                        ArtifactRef::new(namespace, backend.id(), name),
                        payload,
                    )))
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    last_error.get_or_insert(e);
                }
            }
        }
        match last_error {
            Some(e) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// Write an artifact to the backend named in the reference
    ///
    /// # Errors
    /// [`CoreError::NoBackend`] or the backend's error
    pub async fn put(&self, reference: &ArtifactRef, payload: Payload) -> Result<()> {
        let backend = self.route(reference.namespace, &reference.backend)?;
        backend.put(reference.namespace, &reference.name, payload).await?;
        Ok(())
    }

    /// Delete one artifact from the named backend
    ///
    /// Related artifacts (the upload, overview or response of the same deck)
    /// are untouched.
    ///
    /// # Errors
    /// [`CoreError::NoBackend`] or the backend's error (NotFound if absent)
    pub async fn delete(&self, kind: ArtifactKind, round: Round, name: &str, backend: &BackendId) -> Result<()> {
        let namespace = Namespace::new(kind, round);
        self.route(namespace, backend)?.delete(namespace, name).await?;
        debug!(%backend, %namespace, name, "deleted");
        Ok(())
    }

    /// Clear a namespace on every backend independently
    ///
    /// Not transactional: one backend may be cleared while another fails.
    /// The report keeps both outcomes.
    pub async fn delete_all(&self, kind: ArtifactKind, round: Round) -> DeleteAllReport {
        let namespace = Namespace::new(kind, round);
        let outcomes: Vec<_> = stream::iter(self.backends_for(namespace))
            .map(|backend| async move { (backend.id(), backend.delete_all(namespace).await) })
            .buffered(self.fanout_limit)
            .collect()
            .await;

        let report = DeleteAllReport { namespace, outcomes };
        if report.is_complete() {
            info!(%namespace, deleted = report.total_deleted(), "namespace cleared");
        } else {
            for (backend, e) in report.failures() {
                warn!(%backend, %namespace, error = %e, "delete-all failed");
            }
        }
        report
    }

    /// Compare a namespace's names across backends
    ///
    /// Read-only; nothing is copied or removed.
    pub async fn sync_report(&self, kind: ArtifactKind, round: Round) -> SyncReport {
        let namespace = Namespace::new(kind, round);
        let mut report = SyncReport {
            namespace,
            backends: Vec::new(),
            holders: BTreeMap::new(),
            failures: Vec::new(),
        };

        for (backend, result) in self.list_each(namespace).await {
            match result {
                Ok(names) => {
                    for name in names {
                        report.holders.entry(name).or_default().insert(backend.clone());
                    }
                    report.backends.push(backend);
                }
                Err(e) => report.failures.push((backend, e)),
            }
        }
        report
    }
}
