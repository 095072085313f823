//! Where each namespace lives in each backend

use deck_artifact::{ArtifactKind, Namespace, Round};

/// Collection segment on the artifact server (`/api/{collection}`)
///
/// Round-2 overviews have no server collection.
#[must_use]
pub fn http_collection(namespace: Namespace) -> Option<&'static str> {
    match (namespace.kind, namespace.round) {
        (ArtifactKind::Upload, Round::One) => Some("uploads"),
        (ArtifactKind::Analysis, Round::One) => Some("analyses"),
        (ArtifactKind::Overview, Round::One) => Some("overviews"),
        (ArtifactKind::Response, Round::One) => Some("responses"),
        (ArtifactKind::Upload, Round::Two) => Some("successful_pitchdecks"),
        (ArtifactKind::Analysis, Round::Two) => Some("r2_analyses"),
        (ArtifactKind::Response, Round::Two) => Some("r2_responses"),
        (ArtifactKind::Overview, Round::Two) => None,
    }
}

/// Flat key prefix in the object store
#[must_use]
pub fn object_prefix(namespace: Namespace) -> &'static str {
    match (namespace.kind, namespace.round) {
        (ArtifactKind::Upload, Round::One) => "uploads/",
        (ArtifactKind::Analysis, Round::One) => "analyses/",
        (ArtifactKind::Overview, Round::One) => "overviews/",
        (ArtifactKind::Response, Round::One) => "responses/",
        (ArtifactKind::Upload, Round::Two) => "successful_pitchdecks/",
        (ArtifactKind::Analysis, Round::Two) => "r2_analysis/",
        (ArtifactKind::Overview, Round::Two) => "r2_overviews/",
        (ArtifactKind::Response, Round::Two) => "r2_responses/",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn all_namespaces() -> Vec<Namespace> {
        ArtifactKind::ALL
            .iter()
            .flat_map(|k| [Namespace::round_one(*k), Namespace::round_two(*k)])
            .collect()
    }

    #[test]
    fn rounds_never_share_a_location() {
        let prefixes: HashSet<_> = all_namespaces().into_iter().map(object_prefix).collect();
        assert_eq!(prefixes.len(), 8);

        let collections: Vec<_> = all_namespaces().into_iter().filter_map(http_collection).collect();
        let unique: HashSet<_> = collections.iter().collect();
        assert_eq!(collections.len(), 7);
        assert_eq!(unique.len(), 7);
    }

    #[test]
    fn promoted_uploads_location() {
        assert_eq!(http_collection(Namespace::PROMOTED_UPLOADS), Some("successful_pitchdecks"));
        assert_eq!(object_prefix(Namespace::PROMOTED_UPLOADS), "successful_pitchdecks/");
    }
}
