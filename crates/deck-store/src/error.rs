//! Backend error types
//!
//! "Not found" is kept apart from every other failure so callers can treat a
//! name that vanished between list and read as routine.

use deck_artifact::{BackendId, Namespace};

/// Errors surfaced by a storage backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Name absent from the targeted backend
    #[error("{namespace}/{name} not found")]
    NotFound { namespace: Namespace, name: String },

    /// Connection, timeout or body read failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Backend answered with an error status other than 404
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body had an unexpected shape
    #[error("decode error: {0}")]
    Decode(String),

    /// Backend has no location for this namespace
    #[error("backend '{backend}' does not hold {namespace}")]
    Unsupported {
        backend: BackendId,
        namespace: Namespace,
    },

    /// Bulk delete removed some objects but not all
    #[error("delete-all incomplete: {deleted} deleted, {} failed", failed.len())]
    Incomplete { deleted: usize, failed: Vec<String> },

    /// Endpoint or base URL could not be used
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl BackendError {
    /// Create not-found error
    pub fn not_found(namespace: Namespace, name: impl Into<String>) -> Self {
        Self::NotFound {
            namespace,
            name: name.into(),
        }
    }

    /// Whether the artifact was simply absent
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether retrying later might succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}
