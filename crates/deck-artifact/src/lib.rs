//! Deck Artifact Model
//!
//! Identities, naming conventions and document shapes shared by every part of
//! the pitch-deck pipeline.
//!
//! # Core Concepts
//!
//! - [`Namespace`]: an [`ArtifactKind`] within a [`Round`]
//! - [`ArtifactRef`]: namespace + [`BackendId`] + name
//! - [`NamingScheme`]: suffix rules linking an upload to its derived documents
//! - [`AnalysisDocument`] / [`OverviewDocument`]: leniently parsed results of
//!   the external analysis step

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod artifact;
mod document;
mod kind;
mod naming;

pub use artifact::{Artifact, ArtifactRef, BackendId, Payload};
pub use document::{
    AnalysisDocument, AnalysisItem, DocumentError, OverviewDocument, DETAILED_ANALYSIS_KEY,
    OVERVIEW_CATEGORY, UNCATEGORIZED,
};
pub use kind::{ArtifactKind, KindParseError, Namespace, Round};
pub use naming::{
    NamingScheme, ANALYSIS_SUFFIX, OVERVIEW_SUFFIX, RESPONSE_SUFFIX, UPLOAD_EXTENSION,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        AnalysisDocument, AnalysisItem, Artifact, ArtifactKind, ArtifactRef, BackendId,
        NamingScheme, Namespace, OverviewDocument, Round,
    };
}
