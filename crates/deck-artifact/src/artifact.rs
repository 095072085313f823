//! Artifact identities
//!
//! A name alone is not unique: the same `X_analysis.json` may exist in both
//! backends. An [`ArtifactRef`] therefore carries the backend it came from,
//! and every follow-up operation is routed back to that backend.

use crate::kind::{ArtifactKind, Namespace, Round};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Raw artifact content
pub type Payload = Vec<u8>;

/// Identifier of a registered storage backend
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendId(String);

impl BackendId {
    /// Create from any label
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The first-party artifact server
    #[inline]
    #[must_use]
    pub fn artifact_server() -> Self {
        Self::new("server")
    }

    /// The hosted object store
    #[inline]
    #[must_use]
    pub fn object_store() -> Self {
        Self::new("object-store")
    }

    /// Label as text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BackendId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BackendId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for BackendId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Where an artifact lives: namespace, backend and name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Kind and round
    pub namespace: Namespace,
    /// Backend holding this copy
    pub backend: BackendId,
    /// Name within the namespace
    pub name: String,
}

impl ArtifactRef {
    /// Create reference
    #[inline]
    #[must_use]
    pub fn new(namespace: Namespace, backend: BackendId, name: impl Into<String>) -> Self {
        Self {
            namespace,
            backend,
            name: name.into(),
        }
    }

    /// Artifact kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        self.namespace.kind
    }

    /// Evaluation round
    #[inline]
    #[must_use]
    pub fn round(&self) -> Round {
        self.namespace.round
    }

    /// Same backend, different namespace and name
    #[must_use]
    pub fn sibling(&self, namespace: Namespace, name: impl Into<String>) -> Self {
        Self::new(namespace, self.backend.clone(), name)
    }
}

impl Display for ArtifactRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.backend, self.namespace, self.name)
    }
}

/// Fetched artifact with its content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Identity
    pub reference: ArtifactRef,
    /// Content bytes
    pub payload: Payload,
}

impl Artifact {
    /// Create artifact
    #[inline]
    #[must_use]
    pub fn new(reference: ArtifactRef, payload: Payload) -> Self {
        Self { reference, payload }
    }

    /// Payload size in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_in_two_backends_is_two_refs() {
        let ns = Namespace::round_one(ArtifactKind::Analysis);
        let a = ArtifactRef::new(ns, BackendId::artifact_server(), "Acme_analysis.json");
        let b = ArtifactRef::new(ns, BackendId::object_store(), "Acme_analysis.json");
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "server:r1/analysis/Acme_analysis.json");
    }

    #[test]
    fn sibling_keeps_backend() {
        let ns = Namespace::round_one(ArtifactKind::Analysis);
        let a = ArtifactRef::new(ns, BackendId::object_store(), "Acme_analysis.json");
        let overview = a.sibling(ns.with_kind(ArtifactKind::Overview), "Acme_overview.json");
        assert_eq!(overview.backend, BackendId::object_store());
        assert_eq!(overview.kind(), ArtifactKind::Overview);
        assert_eq!(overview.round(), Round::One);
    }
}
