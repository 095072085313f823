//! Deck Core - artifact repository and screening pipeline
//!
//! Orchestration written once against the [`deck_store::ArtifactBackend`]
//! contract:
//! - [`ArtifactRepository`]: fan-out listing, routed fetch/delete, best-effort
//!   bulk delete, cross-backend sync report
//! - [`ScoringEngine`]: total score and pass/fail against [`PASS_THRESHOLD`]
//! - [`RankingView`]: joins analyses with overviews and orders them
//! - [`PromotionWorkflow`]: copies passing uploads into round 2
//! - [`AnalysisClient`]: triggers the external analysis step
//! - [`DeckStage`]: per-deck pipeline stages
//!
//! # Example
//!
//! ```rust,ignore
//! use deck_core::prelude::*;
//!
//! let config = DeckConfig::load("deck.toml")?.apply_env_overrides();
//! let repo = config.build_repository()?;
//!
//! let ranking = RankingView::new(&repo).rank(Round::One).await;
//! let report = PromotionWorkflow::new(&repo, config.promotion_target.clone())
//!     .promote(&ranking.entries)
//!     .await;
//! assert!(report.is_complete());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod promotion;
pub mod ranking;
pub mod repository;
pub mod scoring;
pub mod upload;

pub use analysis::{AnalysisClient, AnalysisTrigger, AnalyzeAllReport};
pub use config::{ArtifactServerConfig, DeckConfig, ObjectStoreConfig};
pub use error::{CoreError, Result};
pub use lifecycle::{allowed_transitions, validate_transition, DeckEvidence, DeckStage, RoundEvidence};
pub use promotion::{PromotionOutcome, PromotionReport, PromotionStatus, PromotionWorkflow};
pub use ranking::{sort_and_rank, RankedEntry, Ranking, RankingFailure, RankingView};
pub use repository::{ArtifactRepository, DeleteAllReport, Listing, SyncReport, DEFAULT_FANOUT_LIMIT};
pub use scoring::{ScoringEngine, PASS_THRESHOLD};
pub use upload::{UploadHandle, UploadState};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the deck pipeline
    pub use crate::{
        AnalysisClient, ArtifactRepository, CoreError, DeckConfig, DeckStage, PromotionWorkflow,
        RankedEntry, Ranking, RankingView, ScoringEngine,
    };
    pub use deck_artifact::{ArtifactKind, BackendId, NamingScheme, Round};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
