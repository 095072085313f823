//! Uploads with observable progress
//!
//! [`ArtifactRepository::upload`] starts the write on a background task and
//! returns an [`UploadHandle`]. Progress is published on a `watch` channel
//! that ends in exactly one terminal state: completed, failed or cancelled.

use crate::error::{CoreError, Result};
use crate::repository::ArtifactRepository;
use deck_artifact::{ArtifactKind, ArtifactRef, BackendId, NamingScheme, Namespace, Payload};
use deck_store::ProgressSink;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Progress of one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    /// Task spawned, nothing sent yet
    Pending,
    /// Bytes handed to the backend so far
    InProgress { sent: u64, total: u64 },
    /// Stored; terminal
    Completed,
    /// Backend rejected or transport failed; terminal
    Failed(String),
    /// Caller cancelled before completion; terminal
    Cancelled,
}

impl UploadState {
    /// Whether no further states will follow
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_) | Self::Cancelled)
    }
}

/// Forwards byte counts into the state channel until a terminal state lands
struct WatchProgress(Arc<watch::Sender<UploadState>>);

impl ProgressSink for WatchProgress {
    fn report(&self, sent: u64, total: u64) {
        self.0.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = UploadState::InProgress { sent, total };
            true
        });
    }
}

/// Owns the publishing side of the state channel inside the upload task
///
/// If the task goes away before a terminal state was sent (the backend
/// panicked or the runtime dropped the task) subscribers see `Failed`.
struct TerminalGuard(Arc<watch::Sender<UploadState>>);

impl TerminalGuard {
    fn finish(&self, state: UploadState) {
        self.0.send_replace(state);
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        self.0.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = UploadState::Failed("upload task ended without a result".into());
            true
        });
    }
}

/// Handle to an upload running in the background
#[derive(Debug)]
pub struct UploadHandle {
    reference: ArtifactRef,
    state: watch::Receiver<UploadState>,
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<ArtifactRef>>,
}

impl UploadHandle {
    /// Where the upload is being written
    #[inline]
    #[must_use]
    pub fn reference(&self) -> &ArtifactRef {
        &self.reference
    }

    /// Latest published state
    #[must_use]
    pub fn state(&self) -> UploadState {
        self.state.borrow().clone()
    }

    /// Independent receiver for progress updates
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.state.clone()
    }

    /// Request cancellation
    ///
    /// Returns `false` if cancellation was already requested or the upload
    /// already finished. Bytes already accepted by the backend are not rolled
    /// back.
    pub fn cancel(&mut self) -> bool {
        match self.cancel.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Wait for the terminal state
    ///
    /// # Errors
    /// The backend error, [`CoreError::Cancelled`], or [`CoreError::Upload`]
    /// if the task itself died
    pub async fn wait(self) -> Result<ArtifactRef> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(CoreError::Upload(e.to_string())),
        }
    }
}

impl ArtifactRepository {
    /// Store a new round-1 upload on `backend`
    ///
    /// The name comes from [`NamingScheme::upload_name`]. Must be called
    /// within a Tokio runtime.
    ///
    /// # Errors
    /// [`CoreError::NoBackend`] if `backend` is not registered for uploads
    pub fn upload(
        &self,
        backend: &BackendId,
        display_name: Option<&str>,
        original_file: &str,
        payload: Payload,
    ) -> Result<UploadHandle> {
        let name = NamingScheme::upload_name(display_name, original_file);
        let reference = ArtifactRef::new(Namespace::round_one(ArtifactKind::Upload), backend.clone(), name);
        self.upload_to(reference, payload)
    }

    /// Store `payload` at an explicit reference with progress reporting
    ///
    /// # Errors
    /// [`CoreError::NoBackend`] if the backend does not hold the namespace
    pub fn upload_to(&self, reference: ArtifactRef, payload: Payload) -> Result<UploadHandle> {
        let backend = Arc::clone(
            self.backend(&reference.backend)
                .filter(|b| b.supports(reference.namespace))
                .ok_or_else(|| CoreError::NoBackend {
                    namespace: reference.namespace,
                    backend: reference.backend.clone(),
                })?,
        );

        let (state_tx, state_rx) = watch::channel(UploadState::Pending);
        let state_tx = Arc::new(state_tx);
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let sink = Arc::new(WatchProgress(Arc::clone(&state_tx)));
        let target = reference.clone();

        let task = tokio::spawn(async move {
            let guard = TerminalGuard(state_tx);
            let put = backend.put_with_progress(target.namespace, &target.name, payload, sink);
            tokio::select! {
                result = put => match result {
                    Ok(()) => {
                        debug!(upload = %target, "upload completed");
                        guard.finish(UploadState::Completed);
                        Ok(target)
                    }
                    Err(e) => {
                        warn!(upload = %target, error = %e, "upload failed");
                        guard.finish(UploadState::Failed(e.to_string()));
                        Err(CoreError::Backend(e))
                    }
                },
                Ok(()) = &mut cancel_rx => {
                    debug!(upload = %target, "upload cancelled");
                    guard.finish(UploadState::Cancelled);
                    Err(CoreError::Cancelled)
                }
            }
        });

        Ok(UploadHandle {
            reference,
            state: state_rx,
            cancel: Some(cancel_tx),
            task,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_store::{ArtifactBackend, BackendError, MemoryBackend};

    /// Backend whose writes either never finish or blow up
    struct StuckBackend {
        panics: bool,
    }

    #[async_trait::async_trait]
    impl ArtifactBackend for StuckBackend {
        fn id(&self) -> BackendId {
            "stuck".into()
        }

        fn supports(&self, _namespace: Namespace) -> bool {
            true
        }

        async fn list(&self, _namespace: Namespace) -> std::result::Result<Vec<String>, BackendError> {
            Ok(Vec::new())
        }

        async fn get(&self, namespace: Namespace, name: &str) -> std::result::Result<Payload, BackendError> {
            Err(BackendError::not_found(namespace, name))
        }

        async fn put(
            &self,
            _namespace: Namespace,
            _name: &str,
            _payload: Payload,
        ) -> std::result::Result<(), BackendError> {
            if self.panics {
                panic!("storage driver crashed");
            }
            std::future::pending().await
        }

        async fn delete(&self, namespace: Namespace, name: &str) -> std::result::Result<(), BackendError> {
            Err(BackendError::not_found(namespace, name))
        }

        async fn delete_all(&self, _namespace: Namespace) -> std::result::Result<usize, BackendError> {
            Ok(0)
        }
    }

    fn stuck_repo(panics: bool) -> ArtifactRepository {
        ArtifactRepository::new().with_backend(Arc::new(StuckBackend { panics }))
    }

    #[tokio::test]
    async fn completes_once_with_final_progress() {
        let mem = Arc::new(MemoryBackend::new("mem"));
        let repo = ArtifactRepository::new().with_backend(mem.clone());

        let handle = repo
            .upload(&"mem".into(), Some("Acme"), "deck-final.pdf", b"%PDF-1.7".to_vec())
            .unwrap();
        let mut states = handle.subscribe();
        let reference = handle.wait().await.unwrap();

        assert_eq!(reference.name, "Acme.pdf");
        assert_eq!(*states.borrow_and_update(), UploadState::Completed);
        assert!(mem.contains(Namespace::round_one(ArtifactKind::Upload), "Acme.pdf"));
    }

    #[tokio::test]
    async fn unknown_backend_is_rejected_up_front() {
        let repo = ArtifactRepository::new();
        let err = repo.upload(&"nowhere".into(), None, "a.pdf", Vec::new()).unwrap_err();
        assert!(matches!(err, CoreError::NoBackend { .. }));
    }

    #[test]
    fn terminal_states() {
        assert!(UploadState::Completed.is_terminal());
        assert!(UploadState::Cancelled.is_terminal());
        assert!(!UploadState::InProgress { sent: 1, total: 2 }.is_terminal());
    }

    #[test]
    fn progress_after_terminal_is_dropped() {
        let (tx, rx) = watch::channel(UploadState::Completed);
        WatchProgress(Arc::new(tx)).report(5, 10);
        assert_eq!(*rx.borrow(), UploadState::Completed);
    }

    #[tokio::test]
    async fn cancel_ends_a_stuck_upload() {
        let repo = stuck_repo(false);
        let mut handle = repo
            .upload(&"stuck".into(), None, "Acme.pdf", b"%PDF-1.7".to_vec())
            .unwrap();
        let mut states = handle.subscribe();

        assert!(handle.cancel());
        assert!(!handle.cancel());
        let err = handle.wait().await.unwrap_err();

        assert!(matches!(err, CoreError::Cancelled));
        assert_eq!(*states.borrow_and_update(), UploadState::Cancelled);
    }

    #[tokio::test]
    async fn panicking_backend_still_reaches_a_terminal_state() {
        let repo = stuck_repo(true);
        let handle = repo
            .upload(&"stuck".into(), None, "Acme.pdf", b"%PDF-1.7".to_vec())
            .unwrap();
        let mut states = handle.subscribe();

        let err = handle.wait().await.unwrap_err();

        assert!(matches!(err, CoreError::Upload(_)));
        assert!(matches!(*states.borrow_and_update(), UploadState::Failed(_)));
    }

    #[test]
    fn dropped_guard_fails_unfinished_upload() {
        let (tx, rx) = watch::channel(UploadState::InProgress { sent: 1, total: 2 });
        drop(TerminalGuard(Arc::new(tx)));
        assert!(matches!(*rx.borrow(), UploadState::Failed(_)));

        let (tx, rx) = watch::channel(UploadState::Pending);
        let guard = TerminalGuard(Arc::new(tx));
        guard.finish(UploadState::Completed);
        drop(guard);
        assert_eq!(*rx.borrow(), UploadState::Completed);
    }
}
