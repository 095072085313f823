//! Artifact kinds, evaluation rounds and the namespaces they form
//!
//! Every stored artifact lives in exactly one [`Namespace`]: the pair of its
//! [`ArtifactKind`] and its [`Round`]. Round-1 and round-2 artifacts of the same
//! kind never share a namespace.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Kind of pitch-deck-derived document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Raw uploaded deck (binary PDF)
    Upload,
    /// Structured per-category analysis
    Analysis,
    /// Flat summary produced alongside the analysis
    Overview,
    /// Full response captured from the analysis step
    Response,
}

impl ArtifactKind {
    /// All kinds in pipeline order
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Upload,
        ArtifactKind::Analysis,
        ArtifactKind::Overview,
        ArtifactKind::Response,
    ];

    /// Stable lowercase label
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Analysis => "analysis",
            Self::Overview => "overview",
            Self::Response => "response",
        }
    }

    /// Whether the payload is a structured JSON document
    #[inline]
    #[must_use]
    pub fn is_document(self) -> bool {
        !matches!(self, Self::Upload)
    }

    /// MIME type used when writing a payload of this kind
    #[inline]
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Upload => "application/pdf",
            _ => "application/json",
        }
    }
}

impl Display for ArtifactKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = KindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upload" | "uploads" => Ok(Self::Upload),
            "analysis" | "analyses" => Ok(Self::Analysis),
            "overview" | "overviews" => Ok(Self::Overview),
            "response" | "responses" => Ok(Self::Response),
            other => Err(KindParseError::UnknownKind(other.to_string())),
        }
    }
}

/// Evaluation round
///
/// Round 1 is the initial screening of every upload; round 2 is the deep-dive
/// on promoted candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Round {
    /// Initial screening
    #[serde(rename = "1")]
    One,
    /// Deep-dive on promoted candidates
    #[serde(rename = "2")]
    Two,
}

impl Round {
    /// Numeric value (1 or 2)
    #[inline]
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    /// Build from a numeric value
    ///
    /// # Errors
    /// Returns [`KindParseError::UnknownRound`] for anything other than 1 or 2
    pub fn from_number(n: u8) -> Result<Self, KindParseError> {
        match n {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(KindParseError::UnknownRound(other.to_string())),
        }
    }
}

impl Default for Round {
    fn default() -> Self {
        Self::One
    }
}

impl Display for Round {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl FromStr for Round {
    type Err = KindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" | "r1" | "one" => Ok(Self::One),
            "2" | "r2" | "two" => Ok(Self::Two),
            other => Err(KindParseError::UnknownRound(other.to_string())),
        }
    }
}

/// Isolated artifact collection: one kind within one round
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Namespace {
    /// Artifact kind
    pub kind: ArtifactKind,
    /// Evaluation round
    pub round: Round,
}

impl Namespace {
    /// Create namespace
    #[inline]
    #[must_use]
    pub const fn new(kind: ArtifactKind, round: Round) -> Self {
        Self { kind, round }
    }

    /// Round-1 namespace for a kind
    #[inline]
    #[must_use]
    pub const fn round_one(kind: ArtifactKind) -> Self {
        Self::new(kind, Round::One)
    }

    /// Round-2 namespace for a kind
    #[inline]
    #[must_use]
    pub const fn round_two(kind: ArtifactKind) -> Self {
        Self::new(kind, Round::Two)
    }

    /// Same kind, other round
    #[inline]
    #[must_use]
    pub const fn with_round(self, round: Round) -> Self {
        Self::new(self.kind, round)
    }

    /// Same round, other kind
    #[inline]
    #[must_use]
    pub const fn with_kind(self, kind: ArtifactKind) -> Self {
        Self::new(kind, self.round)
    }

    /// Namespace that receives promoted uploads
    pub const PROMOTED_UPLOADS: Namespace = Namespace::round_two(ArtifactKind::Upload);
}

impl Display for Namespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "r{}/{}", self.round.number(), self.kind)
    }
}

/// Errors parsing kinds and rounds from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KindParseError {
    /// Not one of upload/analysis/overview/response
    #[error("unknown artifact kind: '{0}'")]
    UnknownKind(String),

    /// Not round 1 or 2
    #[error("unknown round: '{0}'")]
    UnknownRound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_singular_and_plural() {
        assert_eq!("analyses".parse::<ArtifactKind>().unwrap(), ArtifactKind::Analysis);
        assert_eq!("Upload".parse::<ArtifactKind>().unwrap(), ArtifactKind::Upload);
        assert!("deck".parse::<ArtifactKind>().is_err());
    }

    #[test]
    fn round_numbers() {
        assert_eq!(Round::from_number(2).unwrap(), Round::Two);
        assert!(Round::from_number(3).is_err());
        assert_eq!("r1".parse::<Round>().unwrap(), Round::One);
    }

    #[test]
    fn namespaces_differ_by_round() {
        let r1 = Namespace::round_one(ArtifactKind::Upload);
        let r2 = r1.with_round(Round::Two);
        assert_ne!(r1, r2);
        assert_eq!(r2, Namespace::PROMOTED_UPLOADS);
        assert_eq!(r1.to_string(), "r1/upload");
    }

    #[test]
    fn only_uploads_are_binary() {
        assert!(!ArtifactKind::Upload.is_document());
        assert!(ArtifactKind::ALL[1..].iter().all(|k| k.is_document()));
        assert_eq!(ArtifactKind::Overview.content_type(), "application/json");
    }
}
