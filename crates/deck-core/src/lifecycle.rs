//! Pipeline stages of a single pitch deck
//!
//! Transitions happen only on explicit calls (a user action or a batch
//! "analyze all"); nothing advances on a timer, and no transition deletes
//! anything.

use crate::error::{CoreError, Result};
use crate::repository::ArtifactRepository;
use crate::scoring::ScoringEngine;
use deck_artifact::{AnalysisDocument, ArtifactKind, NamingScheme, Namespace, Round};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Stage of one deck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeckStage {
    Uploaded,
    Analyzed,
    Ranked,
    Promoted,
    /// Terminal for round 1
    Rejected,
    Round2Uploaded,
    Round2Analyzed,
    /// Terminal for round 2
    Round2Ranked,
}

impl Display for DeckStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Uploaded => "uploaded",
            Self::Analyzed => "analyzed",
            Self::Ranked => "ranked",
            Self::Promoted => "promoted",
            Self::Rejected => "rejected",
            Self::Round2Uploaded => "round2-uploaded",
            Self::Round2Analyzed => "round2-analyzed",
            Self::Round2Ranked => "round2-ranked",
        };
        f.write_str(label)
    }
}

/// Stages reachable in one step
#[must_use]
pub fn allowed_transitions(from: DeckStage) -> Vec<DeckStage> {
    use DeckStage::*;
    match from {
        Uploaded => vec![Analyzed],
        Analyzed => vec![Ranked],
        Ranked => vec![Promoted, Rejected],
        Promoted => vec![Round2Uploaded],
        Round2Uploaded => vec![Round2Analyzed],
        Round2Analyzed => vec![Round2Ranked],
        Rejected | Round2Ranked => vec![],
    }
}

/// Check a single-step transition
///
/// # Errors
/// [`CoreError::IllegalTransition`] if `to` is not reachable from `from`
pub fn validate_transition(from: DeckStage, to: DeckStage) -> Result<()> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(CoreError::IllegalTransition { from, to })
    }
}

/// What exists for a deck in one round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundEvidence {
    /// No upload in this round
    #[default]
    Absent,
    /// Upload present, no analysis yet
    Uploaded,
    /// Analysis present but unreadable as a document
    Analyzed,
    /// Analysis present and scored
    Scored(i64),
}

/// Artifacts observed for one deck across both rounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeckEvidence {
    /// Round-1 artifacts
    pub round_one: RoundEvidence,
    /// Round-2 artifacts
    pub round_two: RoundEvidence,
}

impl DeckStage {
    /// Move to `to` if the pipeline allows it
    ///
    /// # Errors
    /// [`CoreError::IllegalTransition`] otherwise
    pub fn transition(self, to: DeckStage) -> Result<DeckStage> {
        validate_transition(self, to).map(|()| to)
    }

    /// Whether the deck has left the pipeline
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        allowed_transitions(self).is_empty()
    }

    /// Round the stage belongs to
    #[must_use]
    pub fn round(self) -> Round {
        match self {
            Self::Round2Uploaded | Self::Round2Analyzed | Self::Round2Ranked => Round::Two,
            _ => Round::One,
        }
    }

    /// Derive the current stage from which artifacts exist
    ///
    /// Promotion and the round-2 upload are one act, so an observed deck is
    /// never reported as [`DeckStage::Promoted`]: a promoted deck shows up as
    /// [`DeckStage::Round2Uploaded`]. A scored round-1 analysis is `Ranked`
    /// when it passes and `Rejected` otherwise.
    #[must_use]
    pub fn observe(evidence: &DeckEvidence) -> Option<DeckStage> {
        match evidence.round_two {
            RoundEvidence::Scored(_) => return Some(Self::Round2Ranked),
            RoundEvidence::Analyzed => return Some(Self::Round2Analyzed),
            RoundEvidence::Uploaded => return Some(Self::Round2Uploaded),
            RoundEvidence::Absent => {}
        }
        match evidence.round_one {
            RoundEvidence::Scored(score) if ScoringEngine::passes_threshold(score) => Some(Self::Ranked),
            RoundEvidence::Scored(_) => Some(Self::Rejected),
            RoundEvidence::Analyzed => Some(Self::Analyzed),
            RoundEvidence::Uploaded => Some(Self::Uploaded),
            RoundEvidence::Absent => None,
        }
    }
}

impl ArtifactRepository {
    /// Collect the evidence for one deck by upload name
    ///
    /// Reads only; each artifact is looked up on every backend that holds its
    /// namespace.
    ///
    /// # Errors
    /// A backend failure other than NotFound
    pub async fn deck_evidence(&self, upload: &str) -> Result<DeckEvidence> {
        Ok(DeckEvidence {
            round_one: self.round_evidence(Round::One, upload).await?,
            round_two: self.round_evidence(Round::Two, upload).await?,
        })
    }

    async fn round_evidence(&self, round: Round, upload: &str) -> Result<RoundEvidence> {
        let analysis = NamingScheme::analysis_name(upload);
        if let Some(artifact) = self
            .find(Namespace::new(ArtifactKind::Analysis, round), &analysis)
            .await?
        {
            return Ok(match AnalysisDocument::from_slice(&artifact.payload) {
                Ok(doc) => RoundEvidence::Scored(ScoringEngine::total_score(&doc)),
                Err(_) => RoundEvidence::Analyzed,
            });
        }
        let uploaded = self
            .find(Namespace::new(ArtifactKind::Upload, round), upload)
            .await?
            .is_some();
        Ok(if uploaded {
            RoundEvidence::Uploaded
        } else {
            RoundEvidence::Absent
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranked_branches() {
        assert_eq!(DeckStage::Ranked.transition(DeckStage::Promoted).unwrap(), DeckStage::Promoted);
        assert_eq!(DeckStage::Ranked.transition(DeckStage::Rejected).unwrap(), DeckStage::Rejected);
        assert!(DeckStage::Uploaded.transition(DeckStage::Promoted).is_err());
    }

    #[test]
    fn terminal_stages() {
        assert!(DeckStage::Rejected.is_terminal());
        assert!(DeckStage::Round2Ranked.is_terminal());
        assert!(!DeckStage::Promoted.is_terminal());
        assert!(DeckStage::Rejected.transition(DeckStage::Round2Uploaded).is_err());
    }

    #[test]
    fn observation_prefers_latest_round() {
        let evidence = DeckEvidence {
            round_one: RoundEvidence::Scored(120),
            round_two: RoundEvidence::Uploaded,
        };
        assert_eq!(DeckStage::observe(&evidence), Some(DeckStage::Round2Uploaded));
    }

    #[test]
    fn observation_of_round_one() {
        let scored = |s| DeckEvidence {
            round_one: RoundEvidence::Scored(s),
            round_two: RoundEvidence::Absent,
        };
        assert_eq!(DeckStage::observe(&scored(115)), Some(DeckStage::Ranked));
        assert_eq!(DeckStage::observe(&scored(114)), Some(DeckStage::Rejected));
        assert_eq!(DeckStage::observe(&DeckEvidence::default()), None);
    }
}
