use deck_artifact::{ArtifactKind, Namespace};
use deck_store::{ArtifactBackend, BackendError, ObjectStoreBackend};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const UPLOADS: Namespace = Namespace::round_one(ArtifactKind::Upload);
const OBJECTS: &str = "/storage/v1/b/decks/o";

fn store(server: &MockServer) -> ObjectStoreBackend {
    ObjectStoreBackend::new(&server.uri(), "decks", Duration::from_secs(5))
        .unwrap()
        .with_bearer_token(Some("secret".into()))
}

#[tokio::test]
async fn list_follows_pages_and_strips_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OBJECTS))
        .and(query_param("prefix", "uploads/"))
        .and(query_param_is_missing("pageToken"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"name": "uploads/"}, {"name": "uploads/Acme.pdf"}],
            "nextPageToken": "p2"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(OBJECTS))
        .and(query_param("pageToken", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"name": "uploads/Beta.pdf"}, {"name": "uploads/archive/Old.pdf"}]
        })))
        .mount(&server)
        .await;

    let names = store(&server).list(UPLOADS).await.unwrap();
    assert_eq!(names, vec!["Acme.pdf", "Beta.pdf"]);
}

#[tokio::test]
async fn empty_bucket_lists_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OBJECTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    assert!(store(&server).list(UPLOADS).await.unwrap().is_empty());
    assert_eq!(store(&server).delete_all(UPLOADS).await.unwrap(), 0);
}

#[tokio::test]
async fn get_resolves_media_link() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/storage/v1/b/decks/o/uploads%2FAcme.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "uploads/Acme.pdf",
            "mediaLink": format!("{}/download/acme", server.uri())
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/download/acme"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(store(&server).get(UPLOADS, "Acme.pdf").await.unwrap(), b"%PDF");
}

#[tokio::test]
async fn get_without_media_link_reads_alt_media() {
    let server = MockServer::start().await;
    let object = "/storage/v1/b/decks/o/analyses%2FAcme_analysis.json";
    Mock::given(method("GET"))
        .and(path(object))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"Team":[]}"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(object))
        .and(query_param_is_missing("alt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "analyses/Acme_analysis.json"})))
        .mount(&server)
        .await;

    let payload = store(&server)
        .get(Namespace::round_one(ArtifactKind::Analysis), "Acme_analysis.json")
        .await
        .unwrap();
    assert_eq!(payload, br#"{"Team":[]}"#);
}

#[tokio::test]
async fn missing_metadata_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/storage/v1/b/decks/o/uploads%2FGone.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = store(&server).get(UPLOADS, "Gone.pdf").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn put_uses_media_upload_with_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/storage/v1/b/decks/o"))
        .and(query_param("uploadType", "media"))
        .and(query_param("name", "successful_pitchdecks/Acme.pdf"))
        .and(header("content-type", "application/pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "successful_pitchdecks/Acme.pdf"})))
        .expect(1)
        .mount(&server)
        .await;

    store(&server)
        .put(Namespace::PROMOTED_UPLOADS, "Acme.pdf", b"%PDF".to_vec())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].body, b"%PDF");
}

#[tokio::test]
async fn delete_all_itemizes_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OBJECTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"name": "uploads/a.pdf"},
                {"name": "uploads/b.pdf"},
                {"name": "uploads/c.pdf"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/storage/v1/b/decks/o/uploads%2Fa.pdf"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/storage/v1/b/decks/o/uploads%2Fb.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/storage/v1/b/decks/o/uploads%2Fc.pdf"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = store(&server).delete_all(UPLOADS).await.unwrap_err();
    assert_eq!(
        err,
        BackendError::Incomplete {
            deleted: 2,
            failed: vec!["c.pdf".into()]
        }
    );
}
