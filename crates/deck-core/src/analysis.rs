//! Client for the external analysis step
//!
//! Analysis itself is opaque: the server reads an upload, runs it through the
//! analysis engine and writes the resulting analysis, overview and response
//! artifacts. This client only triggers that work.

use crate::error::{CoreError, Result};
use crate::repository::ArtifactRepository;
use deck_artifact::{ArtifactKind, ArtifactRef, BackendId, Round};
use deck_store::{expect_success, BackendError};
use futures::stream::{self, StreamExt};
use reqwest::{Client, Url};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Which analysis endpoint handles an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisTrigger {
    /// Round-1 upload held by the artifact server
    Server,
    /// Round-1 upload held by the object store
    ObjectStore,
    /// Promoted round-2 upload
    RoundTwo,
}

impl AnalysisTrigger {
    /// Endpoint for an upload of `round` held by `backend`
    #[must_use]
    pub fn for_upload(round: Round, backend: &BackendId) -> Self {
        match round {
            Round::Two => Self::RoundTwo,
            Round::One if *backend == BackendId::object_store() => Self::ObjectStore,
            Round::One => Self::Server,
        }
    }

    /// Path segment under `/api`
    #[must_use]
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Server => "analyze",
            Self::ObjectStore => "analyze-firebase",
            Self::RoundTwo => "round_two_analysis",
        }
    }
}

/// Itemized result of triggering analysis for a whole round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeAllReport {
    /// Round analyzed
    pub round: Round,
    /// One outcome per listed upload
    pub outcomes: Vec<(ArtifactRef, std::result::Result<(), CoreError>)>,
    /// Backends whose upload listing failed
    pub listing_failures: Vec<(BackendId, BackendError)>,
}

impl AnalyzeAllReport {
    /// Whether every upload was analyzed
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.listing_failures.is_empty() && self.outcomes.iter().all(|(_, r)| r.is_ok())
    }

    /// Number of uploads analyzed successfully
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_ok()).count()
    }
}

/// Triggers analysis and server-side promotion on the artifact server
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    base_url: Url,
    client: Client,
}

impl AnalysisClient {
    /// Create client for a server root
    ///
    /// Analysis can take minutes; pick `timeout` accordingly.
    ///
    /// # Errors
    /// [`CoreError::Config`] for an unusable URL
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| CoreError::Config(format!("analysis server url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(CoreError::Config(format!("analysis server url: {base_url}")));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    fn url(&self, endpoint: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CoreError::Config(format!("analysis server url: {}", self.base_url)))?
            .pop_if_empty()
            .push("api")
            .push(endpoint);
        Ok(url)
    }

    async fn post(&self, endpoint: &str, body: serde_json::Value) -> Result<()> {
        let resp = self.client.post(self.url(endpoint)?).json(&body).send().await?;
        expect_success(resp).await?;
        Ok(())
    }

    /// Ask the server to analyze one upload
    ///
    /// # Errors
    /// Transport failure or a non-success status
    pub async fn analyze(&self, trigger: AnalysisTrigger, filename: &str) -> Result<()> {
        debug!(endpoint = trigger.endpoint(), filename, "triggering analysis");
        self.post(trigger.endpoint(), json!({ "filename": filename })).await
    }

    /// Ask the server to copy uploads into its round-2 candidate collection
    ///
    /// # Errors
    /// Transport failure or a non-success status
    pub async fn copy_successful(&self, filenames: &[String]) -> Result<()> {
        self.post("copy_successful_pitchdecks", json!({ "filenames": filenames }))
            .await
    }

    /// Trigger analysis for every upload of a round, on every backend
    ///
    /// Each upload is independent: completed items stay completed if the
    /// caller abandons the future.
    pub async fn analyze_all(&self, repository: &ArtifactRepository, round: Round) -> AnalyzeAllReport {
        let listing = repository.list_all(ArtifactKind::Upload, round).await;

        let outcomes: Vec<_> = stream::iter(listing.entries)
            .map(|reference| async move {
                let trigger = AnalysisTrigger::for_upload(round, &reference.backend);
                let result = self.analyze(trigger, &reference.name).await;
                if let Err(e) = &result {
                    warn!(upload = %reference, error = %e, "analysis failed");
                }
                (reference, result)
            })
            .buffered(repository.fanout_limit())
            .collect()
            .await;

        let report = AnalyzeAllReport {
            round,
            outcomes,
            listing_failures: listing.failures,
        };
        info!(%round, analyzed = report.succeeded(), total = report.outcomes.len(), "analyze-all finished");
        report
    }
}
