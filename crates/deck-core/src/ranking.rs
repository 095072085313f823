//! Joined, scored and ordered view of a round's analyses
//!
//! Rankings are derived on demand and never stored. Ordering is
//! deterministic: artifacts are first put in (name, backend) order, then
//! stably sorted by total score, so ties keep the same relative order on
//! every refresh of unchanged data.

use crate::error::{CoreError, Result};
use crate::repository::ArtifactRepository;
use crate::scoring::ScoringEngine;
use deck_artifact::{
    AnalysisDocument, ArtifactKind, ArtifactRef, BackendId, NamingScheme, Namespace,
    OverviewDocument, Round,
};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

/// One scored analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    /// 1-based position after sorting; 0 until ranked
    pub rank: usize,
    /// Analysis artifact name
    pub name: String,
    /// Backend the analysis was read from
    pub backend: BackendId,
    /// Round the analysis belongs to
    pub round: Round,
    /// Sum of item scores
    pub total_score: i64,
    /// Joined overview, or placeholders when none could be read
    pub overview: OverviewDocument,
    /// `total_score >= PASS_THRESHOLD`
    pub passes_threshold: bool,
}

impl RankedEntry {
    /// Build an unranked entry from a parsed document
    #[must_use]
    pub fn scored(reference: &ArtifactRef, document: &AnalysisDocument, overview: OverviewDocument) -> Self {
        let (total_score, passes_threshold) = ScoringEngine::evaluate(document);
        Self {
            rank: 0,
            name: reference.name.clone(),
            backend: reference.backend.clone(),
            round: reference.round(),
            total_score,
            overview,
            passes_threshold,
        }
    }

    /// Upload this analysis was produced from
    #[must_use]
    pub fn upload_name(&self) -> String {
        NamingScheme::upload_from_analysis(&self.name)
    }

    /// Reference to the analysis artifact
    #[must_use]
    pub fn analysis_ref(&self) -> ArtifactRef {
        ArtifactRef::new(
            Namespace::new(ArtifactKind::Analysis, self.round),
            self.backend.clone(),
            self.name.clone(),
        )
    }
}

/// Analysis that could not be ranked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingFailure {
    /// Backend involved
    pub backend: BackendId,
    /// Analysis name, absent when the whole backend listing failed
    pub name: Option<String>,
    /// Cause
    pub error: CoreError,
}

/// Ranked entries of one round plus whatever could not be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    /// Round ranked
    pub round: Round,
    /// Entries in rank order
    pub entries: Vec<RankedEntry>,
    /// Listings or analyses that failed
    pub failures: Vec<RankingFailure>,
}

impl Ranking {
    /// Whether every listed analysis was ranked
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Entries at or above the threshold
    pub fn passing(&self) -> impl Iterator<Item = &RankedEntry> {
        self.entries.iter().filter(|e| e.passes_threshold)
    }

    /// Entry at a 1-based rank
    #[must_use]
    pub fn at_rank(&self, rank: usize) -> Option<&RankedEntry> {
        rank.checked_sub(1).and_then(|i| self.entries.get(i))
    }
}

/// Stable sort by descending score, then assign 1-based ranks
#[must_use]
pub fn sort_and_rank(mut entries: Vec<RankedEntry>) -> Vec<RankedEntry> {
    entries.sort_by(|a, b| b.total_score.cmp(&a.total_score));
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    entries
}

/// Builds [`Ranking`]s from a repository
#[derive(Debug, Clone, Copy)]
pub struct RankingView<'a> {
    repository: &'a ArtifactRepository,
}

impl<'a> RankingView<'a> {
    /// Create view over a repository
    #[inline]
    #[must_use]
    pub fn new(repository: &'a ArtifactRepository) -> Self {
        Self { repository }
    }

    /// Join, score and order every analysis of a round
    ///
    /// A failed analysis read is recorded and skipped; a failed overview read
    /// falls back to the overview mirrored inside the analysis, then to
    /// placeholders.
    pub async fn rank(&self, round: Round) -> Ranking {
        let listing = self.repository.list_all(ArtifactKind::Analysis, round).await;
        let mut failures: Vec<RankingFailure> = listing
            .failures
            .into_iter()
            .map(|(backend, e)| RankingFailure {
                backend,
                name: None,
                error: e.into(),
            })
            .collect();

        let mut refs = listing.entries;
        refs.sort_by(|a, b| (&a.name, &a.backend).cmp(&(&b.name, &b.backend)));

        let results: Vec<(ArtifactRef, Result<RankedEntry>)> = stream::iter(refs)
            .map(|reference| async move {
                let entry = self.entry(&reference).await;
                (reference, entry)
            })
            .buffered(self.repository.fanout_limit())
            .collect()
            .await;

        let mut entries = Vec::with_capacity(results.len());
        for (reference, result) in results {
            match result {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    warn!(analysis = %reference, error = %error, "analysis skipped");
                    failures.push(RankingFailure {
                        backend: reference.backend,
                        name: Some(reference.name),
                        error,
                    });
                }
            }
        }

        let entries = sort_and_rank(entries);
        info!(
            %round,
            ranked = entries.len(),
            passing = entries.iter().filter(|e| e.passes_threshold).count(),
            failed = failures.len(),
            "ranking built"
        );
        Ranking {
            round,
            entries,
            failures,
        }
    }

    async fn entry(&self, reference: &ArtifactRef) -> Result<RankedEntry> {
        let artifact = self.repository.fetch_ref(reference).await?;
        let document = AnalysisDocument::from_slice(&artifact.payload)
            .map_err(|e| CoreError::malformed(&reference.name, e))?;
        let overview = self.overview_for(reference, &document).await;
        Ok(RankedEntry::scored(reference, &document, overview))
    }

    async fn overview_for(&self, analysis: &ArtifactRef, document: &AnalysisDocument) -> OverviewDocument {
        let namespace = analysis.namespace.with_kind(ArtifactKind::Overview);
        let mut last = None;
        for upload in NamingScheme::upload_candidates(&analysis.name, ArtifactKind::Analysis, analysis.round()) {
            let overview_ref = analysis.sibling(namespace, NamingScheme::overview_name(&upload));
            let fetched = match self.repository.fetch_ref(&overview_ref).await {
                Ok(artifact) => OverviewDocument::from_slice(&artifact.payload)
                    .map_err(|e| CoreError::malformed(&overview_ref.name, e)),
                Err(e) => Err(e),
            };
            match fetched {
                Ok(overview) => return overview,
                Err(e) if e.is_not_found() => last = Some((overview_ref, e)),
                Err(e) => {
                    last = Some((overview_ref, e));
                    break;
                }
            }
        }

        if let Some(embedded) = document.overview() {
            debug!(analysis = %analysis, "using overview mirrored in analysis");
            return embedded;
        }
        match last {
            Some((overview_ref, e)) if !(e.is_not_found() || matches!(e, CoreError::NoBackend { .. })) => {
                warn!(overview = %overview_ref, error = %e, "overview unreadable");
            }
            _ => debug!(analysis = %analysis, "no overview"),
        }
        OverviewDocument::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(name: &str, score: i64) -> RankedEntry {
        RankedEntry {
            rank: 0,
            name: name.to_string(),
            backend: BackendId::artifact_server(),
            round: Round::One,
            total_score: score,
            overview: OverviewDocument::empty(),
            passes_threshold: ScoringEngine::passes_threshold(score),
        }
    }

    #[test]
    fn ties_keep_input_order() {
        let ranked = sort_and_rank(vec![entry("a", 80), entry("b", 115), entry("c", 115), entry("d", 60)]);
        let order: Vec<_> = ranked.iter().map(|e| (e.rank, e.name.as_str())).collect();
        assert_eq!(order, vec![(1, "b"), (2, "c"), (3, "a"), (4, "d")]);
    }

    #[test]
    fn at_rank_is_one_based() {
        let ranking = Ranking {
            round: Round::One,
            entries: sort_and_rank(vec![entry("a", 1), entry("b", 2)]),
            failures: Vec::new(),
        };
        assert_eq!(ranking.at_rank(1).map(|e| e.name.as_str()), Some("b"));
        assert!(ranking.at_rank(0).is_none());
        assert!(ranking.at_rank(3).is_none());
    }

    #[test]
    fn upload_name_reverses_analysis_name() {
        assert_eq!(entry("Acme_analysis.json", 0).upload_name(), "Acme.pdf");
        assert_eq!(entry("Acme_r2_analysis.json", 0).upload_name(), "Acme_r2.pdf");
    }
}
