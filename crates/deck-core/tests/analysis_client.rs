use deck_artifact::{ArtifactKind, BackendId, Namespace, Round};
use deck_core::{AnalysisClient, AnalysisTrigger, ArtifactRepository, CoreError};
use deck_store::{BackendError, MemoryBackend};
use deck_test_utils::pdf_bytes;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const R1_UPLOADS: Namespace = Namespace::round_one(ArtifactKind::Upload);

fn client(server: &MockServer) -> AnalysisClient {
    AnalysisClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn posts_filename_to_trigger_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/round_two_analysis"))
        .and(body_json(json!({"filename": "Acme.pdf"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .analyze(AnalysisTrigger::RoundTwo, "Acme.pdf")
        .await
        .unwrap();
}

#[tokio::test]
async fn server_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analyze"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model unavailable"))
        .mount(&server)
        .await;

    let err = client(&server)
        .analyze(AnalysisTrigger::Server, "Acme.pdf")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CoreError::Backend(BackendError::Status {
            status: 500,
            body: "model unavailable".into()
        })
    );
}

#[tokio::test]
async fn copy_successful_sends_all_names() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/copy_successful_pitchdecks"))
        .and(body_json(json!({"filenames": ["Acme.pdf", "Beta.pdf"]})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .copy_successful(&["Acme.pdf".to_string(), "Beta.pdf".to_string()])
        .await
        .unwrap();
}

#[tokio::test]
async fn analyze_all_picks_endpoint_per_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analyze"))
        .and(body_json(json!({"filename": "Acme.pdf"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/analyze-firebase"))
        .and(body_json(json!({"filename": "Beta.pdf"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/analyze-firebase"))
        .and(body_json(json!({"filename": "Gamma.pdf"})))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let repo = ArtifactRepository::new()
        .with_backend(Arc::new(
            MemoryBackend::new(BackendId::artifact_server()).with_artifact(R1_UPLOADS, "Acme.pdf", pdf_bytes("Acme")),
        ))
        .with_backend(Arc::new(
            MemoryBackend::new(BackendId::object_store())
                .with_artifact(R1_UPLOADS, "Beta.pdf", pdf_bytes("Beta"))
                .with_artifact(R1_UPLOADS, "Gamma.pdf", pdf_bytes("Gamma")),
        ));

    let report = client(&server).analyze_all(&repo, Round::One).await;

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.succeeded(), 2);
    assert!(!report.is_complete());
    let failed: Vec<&str> = report
        .outcomes
        .iter()
        .filter(|(_, r)| r.is_err())
        .map(|(reference, _)| reference.name.as_str())
        .collect();
    assert_eq!(failed, vec!["Gamma.pdf"]);
}
