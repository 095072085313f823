//! Error types for the deck pipeline core

use crate::lifecycle::DeckStage;
use deck_artifact::{BackendId, Namespace};
use deck_store::BackendError;

/// Errors raised by repository, ranking, promotion and analysis operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Failure reported by a storage backend
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// No registered backend with this id holds the namespace
    #[error("no backend '{backend}' registered for {namespace}")]
    NoBackend {
        namespace: Namespace,
        backend: BackendId,
    },

    /// Payload could not be read as a document at all
    #[error("malformed document {name}: {reason}")]
    MalformedDocument { name: String, reason: String },

    /// Invalid or incomplete configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Upload task ended abnormally
    #[error("upload failed: {0}")]
    Upload(String),

    /// Operation was cancelled by the caller
    #[error("operation cancelled")]
    Cancelled,

    /// Stage change not permitted by the pipeline
    #[error("illegal stage transition: {from} -> {to}")]
    IllegalTransition { from: DeckStage, to: DeckStage },
}

impl CoreError {
    /// Create malformed-document error
    pub fn malformed(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedDocument {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the underlying cause is an absent artifact
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Backend(e) if e.is_not_found())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        Self::Backend(BackendError::from(e))
    }
}

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
