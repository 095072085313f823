//! Copying passing round-1 uploads into the round-2 candidate namespace
//!
//! Promotion writes a new upload under [`Namespace::PROMOTED_UPLOADS`]; the
//! round-1 original is never moved, renamed or deleted. Re-running overwrites
//! with identical content, so promotion is idempotent. Each deck is copied
//! independently and gets its own outcome.

use crate::error::{CoreError, Result};
use crate::ranking::RankedEntry;
use crate::repository::ArtifactRepository;
use deck_artifact::{Artifact, ArtifactKind, ArtifactRef, BackendId, Namespace, Round};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

/// What happened to one deck
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromotionStatus {
    /// Copied into the promoted namespace
    Promoted {
        /// Backend the upload was read from
        source: BackendId,
        /// Bytes written
        bytes: usize,
    },
    /// Dry run: would have been copied from `source`
    WouldPromote {
        /// Backend holding the upload
        source: BackendId,
    },
    /// Copy failed; other decks are unaffected
    Failed(CoreError),
}

/// Outcome for one passing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionOutcome {
    /// Analysis that passed
    pub analysis: String,
    /// Upload derived from it
    pub upload: String,
    /// Result of the copy
    pub status: PromotionStatus,
}

impl PromotionOutcome {
    /// Whether this deck failed
    #[inline]
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.status, PromotionStatus::Failed(_))
    }
}

/// Itemized result of a promotion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionReport {
    /// Backend receiving promoted uploads
    pub target: BackendId,
    /// One outcome per passing round-1 entry, in input order
    pub outcomes: Vec<PromotionOutcome>,
    /// Entries skipped because they did not pass or were not round 1
    pub skipped: usize,
}

impl PromotionReport {
    /// Whether every passing deck was promoted
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.outcomes.iter().any(PromotionOutcome::is_failure)
    }

    /// Outcomes that failed
    pub fn failures(&self) -> impl Iterator<Item = &PromotionOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// Upload names that were (or in a dry run would be) promoted
    pub fn promoted(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_failure())
            .map(|o| o.upload.as_str())
    }
}

/// Promotes passing round-1 decks
#[derive(Debug, Clone)]
pub struct PromotionWorkflow<'a> {
    repository: &'a ArtifactRepository,
    target: BackendId,
    dry_run: bool,
}

impl<'a> PromotionWorkflow<'a> {
    /// Create workflow writing to `target`
    #[inline]
    #[must_use]
    pub fn new(repository: &'a ArtifactRepository, target: BackendId) -> Self {
        Self {
            repository,
            target,
            dry_run: false,
        }
    }

    /// Resolve sources without writing anything
    #[inline]
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Promote every passing round-1 entry
    pub async fn promote(&self, entries: &[RankedEntry]) -> PromotionReport {
        let candidates: Vec<&RankedEntry> = entries
            .iter()
            .filter(|e| e.round == Round::One && e.passes_threshold)
            .collect();
        let skipped = entries.len() - candidates.len();

        let outcomes: Vec<PromotionOutcome> = stream::iter(candidates)
            .map(|entry| async move {
                let upload = entry.upload_name();
                let status = match self.promote_one(entry, &upload).await {
                    Ok(status) => status,
                    Err(e) => {
                        warn!(upload = %upload, error = %e, "promotion failed");
                        PromotionStatus::Failed(e)
                    }
                };
                PromotionOutcome {
                    analysis: entry.name.clone(),
                    upload,
                    status,
                }
            })
            .buffered(self.repository.fanout_limit())
            .collect()
            .await;

        let report = PromotionReport {
            target: self.target.clone(),
            outcomes,
            skipped,
        };
        info!(
            target = %report.target,
            dry_run = self.dry_run,
            promoted = report.promoted().count(),
            failed = report.failures().count(),
            skipped,
            "promotion finished"
        );
        report
    }

    async fn promote_one(&self, entry: &RankedEntry, upload: &str) -> Result<PromotionStatus> {
        let source = self.locate(entry, upload).await?;

        if self.dry_run {
            return Ok(PromotionStatus::WouldPromote {
                source: source.reference.backend,
            });
        }

        let bytes = source.payload.len();
        let destination = ArtifactRef::new(Namespace::PROMOTED_UPLOADS, self.target.clone(), upload);
        self.repository.put(&destination, source.payload).await?;
        debug!(upload, from = %source.reference.backend, to = %self.target, bytes, "promoted");
        Ok(PromotionStatus::Promoted {
            source: source.reference.backend,
            bytes,
        })
    }

    /// Upload from the analysis's own backend first, then any other backend
    async fn locate(&self, entry: &RankedEntry, upload: &str) -> Result<Artifact> {
        let namespace = Namespace::round_one(ArtifactKind::Upload);
        let mut order = vec![entry.backend.clone()];
        order.extend(
            self.repository
                .backends_for(namespace)
                .into_iter()
                .map(|b| b.id())
                .filter(|id| id != &entry.backend),
        );

        let mut last_error: Option<CoreError> = None;
        for backend in order {
            let reference = ArtifactRef::new(namespace, backend, upload);
            match self.repository.fetch_ref(&reference).await {
                Ok(artifact) => return Ok(artifact),
                Err(e) if e.is_not_found() || matches!(e, CoreError::NoBackend { .. }) => {
                    last_error.get_or_insert(e);
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or(CoreError::NoBackend {
            namespace,
            backend: entry.backend.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_artifact::OverviewDocument;
    use deck_store::MemoryBackend;
    use std::sync::Arc;

    const UPLOADS: Namespace = Namespace::round_one(ArtifactKind::Upload);

    fn passing(name: &str, backend: BackendId) -> RankedEntry {
        RankedEntry {
            rank: 1,
            name: name.to_string(),
            backend,
            round: Round::One,
            total_score: 120,
            overview: OverviewDocument::empty(),
            passes_threshold: true,
        }
    }

    #[tokio::test]
    async fn upload_found_on_other_backend() {
        let server = Arc::new(MemoryBackend::new(BackendId::artifact_server()));
        let cloud = Arc::new(MemoryBackend::new(BackendId::object_store()));
        server.insert(UPLOADS, "Acme.pdf", b"%PDF".to_vec());
        let repo = ArtifactRepository::new()
            .with_backend(server.clone())
            .with_backend(cloud.clone());

        let report = PromotionWorkflow::new(&repo, BackendId::object_store())
            .promote(&[passing("Acme_analysis.json", BackendId::object_store())])
            .await;

        assert!(report.is_complete());
        assert_eq!(
            report.outcomes[0].status,
            PromotionStatus::Promoted {
                source: BackendId::artifact_server(),
                bytes: 4
            }
        );
        assert_eq!(cloud.snapshot(Namespace::PROMOTED_UPLOADS).get("Acme.pdf").map(Vec::as_slice), Some(&b"%PDF"[..]));
        assert!(server.contains(UPLOADS, "Acme.pdf"));
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let cloud = Arc::new(MemoryBackend::new(BackendId::object_store()));
        cloud.insert(UPLOADS, "Acme.pdf", b"%PDF".to_vec());
        let repo = ArtifactRepository::new().with_backend(cloud.clone());

        let report = PromotionWorkflow::new(&repo, BackendId::object_store())
            .with_dry_run(true)
            .promote(&[passing("Acme_analysis.json", BackendId::object_store())])
            .await;

        assert_eq!(report.promoted().collect::<Vec<_>>(), vec!["Acme.pdf"]);
        assert!(cloud.snapshot(Namespace::PROMOTED_UPLOADS).is_empty());
    }

    #[tokio::test]
    async fn missing_upload_is_itemized() {
        let cloud = Arc::new(MemoryBackend::new(BackendId::object_store()));
        let repo = ArtifactRepository::new().with_backend(cloud);

        let report = PromotionWorkflow::new(&repo, BackendId::object_store())
            .promote(&[passing("Ghost_analysis.json", BackendId::object_store())])
            .await;

        assert!(!report.is_complete());
        let failure = report.failures().next().unwrap();
        assert_eq!(failure.upload, "Ghost.pdf");
        assert!(matches!(&failure.status, PromotionStatus::Failed(e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn failing_and_round_two_entries_are_skipped() {
        let repo = ArtifactRepository::new().with_backend(Arc::new(MemoryBackend::new(BackendId::object_store())));
        let mut low = passing("Low_analysis.json", BackendId::object_store());
        low.total_score = 114;
        low.passes_threshold = false;
        let mut r2 = passing("Late_analysis.json", BackendId::object_store());
        r2.round = Round::Two;

        let report = PromotionWorkflow::new(&repo, BackendId::object_store())
            .promote(&[low, r2])
            .await;
        assert_eq!(report.skipped, 2);
        assert!(report.outcomes.is_empty());
        assert!(report.is_complete());
    }
}
