//! Name derivation between related artifacts
//!
//! Artifacts carry no foreign keys. An upload `X.pdf` is linked to its
//! analysis `X_analysis.json`, overview `X_overview.json` and response
//! `X_response.json` purely by suffix substitution, identically in every
//! backend and in both rounds. All of that convention lives here.
//!
//! Derivation is best-effort: a name without the expected suffix is returned
//! unchanged instead of failing.

use crate::kind::{ArtifactKind, Round};

/// Extension of raw uploads
pub const UPLOAD_EXTENSION: &str = ".pdf";
/// Suffix of analysis documents
pub const ANALYSIS_SUFFIX: &str = "_analysis.json";
/// Suffix of overview documents
pub const OVERVIEW_SUFFIX: &str = "_overview.json";
/// Suffix of response documents
pub const RESPONSE_SUFFIX: &str = "_response.json";

/// Older servers tagged round-2 results inside the name itself.
const LEGACY_R2_ANALYSIS_SUFFIX: &str = "_r2_analysis.json";
const LEGACY_R2_RESPONSE_SUFFIX: &str = "_r2_response.json";

/// Naming convention for pitch-deck artifacts
///
/// # Examples
/// ```
/// use deck_artifact::NamingScheme;
///
/// let analysis = NamingScheme::analysis_name("Acme.pdf");
/// assert_eq!(analysis, "Acme_analysis.json");
/// assert_eq!(NamingScheme::overview_from_analysis(&analysis), "Acme_overview.json");
/// assert_eq!(NamingScheme::upload_from_analysis(&analysis), "Acme.pdf");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NamingScheme;

impl NamingScheme {
    /// Name for a new upload
    ///
    /// A non-blank display name chosen by the submitter wins; otherwise the
    /// original file name minus its last extension is used. The result always
    /// ends in `.pdf`.
    #[must_use]
    pub fn upload_name(display_name: Option<&str>, original_file: &str) -> String {
        let base = match display_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name,
            None => match original_file.rsplit_once('.') {
                Some((stem, _)) if !stem.is_empty() => stem,
                _ => original_file,
            },
        };
        if base.ends_with(UPLOAD_EXTENSION) {
            base.to_string()
        } else {
            format!("{base}{UPLOAD_EXTENSION}")
        }
    }

    /// Deck stem of an upload name (`X.pdf` → `X`)
    #[inline]
    #[must_use]
    pub fn stem(upload: &str) -> Option<&str> {
        upload.strip_suffix(UPLOAD_EXTENSION)
    }

    /// `X.pdf` → `X_analysis.json`
    #[must_use]
    pub fn analysis_name(upload: &str) -> String {
        Self::swap_upload_suffix(upload, ANALYSIS_SUFFIX)
    }

    /// `X.pdf` → `X_overview.json`
    #[must_use]
    pub fn overview_name(upload: &str) -> String {
        Self::swap_upload_suffix(upload, OVERVIEW_SUFFIX)
    }

    /// `X.pdf` → `X_response.json`
    #[must_use]
    pub fn response_name(upload: &str) -> String {
        Self::swap_upload_suffix(upload, RESPONSE_SUFFIX)
    }

    /// `X_analysis.json` → `X.pdf`
    #[must_use]
    pub fn upload_from_analysis(analysis: &str) -> String {
        Self::restore_upload(analysis, ANALYSIS_SUFFIX)
    }

    /// `X_overview.json` → `X.pdf`
    #[must_use]
    pub fn upload_from_overview(overview: &str) -> String {
        Self::restore_upload(overview, OVERVIEW_SUFFIX)
    }

    /// `X_response.json` → `X.pdf`
    #[must_use]
    pub fn upload_from_response(response: &str) -> String {
        Self::restore_upload(response, RESPONSE_SUFFIX)
    }

    /// Uploads a `kind` artifact of `round` may have been produced from, most
    /// likely first
    ///
    /// The plain derivation always comes first. In round 2 a name in the
    /// legacy `X_r2_analysis.json` / `X_r2_response.json` form adds `X.pdf`
    /// as a second candidate; `Foo_r2.pdf` is a legitimate upload, so the two
    /// readings cannot be told apart from the name alone.
    #[must_use]
    pub fn upload_candidates(name: &str, kind: ArtifactKind, round: Round) -> Vec<String> {
        let plain = match kind {
            ArtifactKind::Upload => return vec![name.to_string()],
            ArtifactKind::Analysis => Self::upload_from_analysis(name),
            ArtifactKind::Overview => Self::upload_from_overview(name),
            ArtifactKind::Response => Self::upload_from_response(name),
        };
        let legacy = match (round, kind) {
            (Round::Two, ArtifactKind::Analysis) => name.strip_suffix(LEGACY_R2_ANALYSIS_SUFFIX),
            (Round::Two, ArtifactKind::Response) => name.strip_suffix(LEGACY_R2_RESPONSE_SUFFIX),
            _ => None,
        };
        let mut candidates = vec![plain];
        if let Some(stem) = legacy {
            candidates.push(format!("{stem}{UPLOAD_EXTENSION}"));
        }
        candidates
    }

    /// `X_analysis.json` → `X_overview.json`
    #[must_use]
    pub fn overview_from_analysis(analysis: &str) -> String {
        let upload = Self::upload_from_analysis(analysis);
        if upload == analysis {
            return analysis.to_string();
        }
        Self::overview_name(&upload)
    }

    /// Name for kind `to`, given a name of kind `from` for the same deck
    ///
    /// Returns `name` unchanged when it does not carry the suffix of `from`.
    #[must_use]
    pub fn derive(name: &str, from: ArtifactKind, to: ArtifactKind) -> String {
        let upload = match from {
            ArtifactKind::Upload => name.to_string(),
            ArtifactKind::Analysis => Self::upload_from_analysis(name),
            ArtifactKind::Overview => Self::upload_from_overview(name),
            ArtifactKind::Response => Self::upload_from_response(name),
        };
        if from != ArtifactKind::Upload && upload == name {
            return name.to_string();
        }
        match to {
            ArtifactKind::Upload => upload,
            ArtifactKind::Analysis => Self::analysis_name(&upload),
            ArtifactKind::Overview => Self::overview_name(&upload),
            ArtifactKind::Response => Self::response_name(&upload),
        }
    }

    /// Kind implied by a name's suffix, if any
    #[must_use]
    pub fn kind_of(name: &str) -> Option<ArtifactKind> {
        if name.ends_with(ANALYSIS_SUFFIX) {
            Some(ArtifactKind::Analysis)
        } else if name.ends_with(OVERVIEW_SUFFIX) {
            Some(ArtifactKind::Overview)
        } else if name.ends_with(RESPONSE_SUFFIX) {
            Some(ArtifactKind::Response)
        } else if name.ends_with(UPLOAD_EXTENSION) {
            Some(ArtifactKind::Upload)
        } else {
            None
        }
    }

    fn swap_upload_suffix(upload: &str, suffix: &str) -> String {
        match Self::stem(upload) {
            Some(stem) => format!("{stem}{suffix}"),
            None => upload.to_string(),
        }
    }

    fn restore_upload(name: &str, suffix: &str) -> String {
        name.strip_suffix(suffix)
            .map_or_else(|| name.to_string(), |stem| format!("{stem}{UPLOAD_EXTENSION}"))
    }
}
