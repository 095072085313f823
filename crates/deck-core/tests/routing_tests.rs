use deck_artifact::{ArtifactKind, BackendId, Namespace, Payload, Round};
use deck_core::{ArtifactRepository, CoreError};
use deck_store::{ArtifactBackend, BackendError};
use mockall::mock;
use mockall::predicate::eq;
use std::sync::Arc;

mock! {
    pub Backend {}

    #[async_trait::async_trait]
    impl ArtifactBackend for Backend {
        fn id(&self) -> BackendId;
        fn supports(&self, namespace: Namespace) -> bool;
        async fn list(&self, namespace: Namespace) -> Result<Vec<String>, BackendError>;
        async fn get(&self, namespace: Namespace, name: &str) -> Result<Payload, BackendError>;
        async fn put(&self, namespace: Namespace, name: &str, payload: Payload) -> Result<(), BackendError>;
        async fn delete(&self, namespace: Namespace, name: &str) -> Result<(), BackendError>;
        async fn delete_all(&self, namespace: Namespace) -> Result<usize, BackendError>;
    }
}

const R1_ANALYSES: Namespace = Namespace::round_one(ArtifactKind::Analysis);

fn backend(id: BackendId) -> MockBackend {
    let mut mock = MockBackend::new();
    mock.expect_id().return_const(id);
    mock.expect_supports().return_const(true);
    mock
}

#[tokio::test]
async fn delete_touches_only_the_named_backend() {
    let mut server = backend(BackendId::artifact_server());
    server.expect_delete().never();
    let mut store = backend(BackendId::object_store());
    store
        .expect_delete()
        .with(eq(R1_ANALYSES), eq("Acme_analysis.json"))
        .times(1)
        .returning(|_, _| Ok(()));

    let repo = ArtifactRepository::new()
        .with_backend(Arc::new(server))
        .with_backend(Arc::new(store));

    repo.delete(
        ArtifactKind::Analysis,
        Round::One,
        "Acme_analysis.json",
        &BackendId::object_store(),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn unsupported_namespace_is_never_listed() {
    let mut server = MockBackend::new();
    server.expect_id().return_const(BackendId::artifact_server());
    server.expect_supports().return_const(false);
    server.expect_list().never();
    let mut store = backend(BackendId::object_store());
    store
        .expect_list()
        .times(1)
        .returning(|_| Ok(vec!["Acme_overview_r2.json".to_string()]));

    let repo = ArtifactRepository::new()
        .with_backend(Arc::new(server))
        .with_backend(Arc::new(store));

    let listing = repo.list_all(ArtifactKind::Overview, Round::Two).await;
    assert!(listing.is_complete());
    assert_eq!(listing.len(), 1);
    assert_eq!(listing.entries[0].backend, BackendId::object_store());
}

#[tokio::test]
async fn delete_all_reports_partial_progress() {
    let mut server = backend(BackendId::artifact_server());
    server.expect_delete_all().times(1).returning(|_| Ok(3));
    let mut store = backend(BackendId::object_store());
    store.expect_delete_all().times(1).returning(|_| {
        Err(BackendError::Incomplete {
            deleted: 2,
            failed: vec!["Zeta_analysis.json".into()],
        })
    });

    let repo = ArtifactRepository::new()
        .with_backend(Arc::new(server))
        .with_backend(Arc::new(store));

    let report = repo.delete_all(ArtifactKind::Analysis, Round::One).await;
    assert!(!report.is_complete());
    assert_eq!(report.total_deleted(), 5);
}

#[tokio::test]
async fn find_surfaces_non_absence_errors() {
    let mut server = backend(BackendId::artifact_server());
    server
        .expect_get()
        .returning(|_, _| Err(BackendError::Transport("timed out".into())));
    let mut store = backend(BackendId::object_store());
    store
        .expect_get()
        .returning(|ns, name| Err(BackendError::not_found(ns, name)));

    let repo = ArtifactRepository::new()
        .with_backend(Arc::new(server))
        .with_backend(Arc::new(store));

    let err = repo.find(R1_ANALYSES, "Acme_analysis.json").await.unwrap_err();
    assert!(matches!(err, CoreError::Backend(BackendError::Transport(_))));
}
