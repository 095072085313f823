//! Testing utilities for the deck pipeline workspace
//!
//! Document builders, a pair of seeded in-memory backends standing in for the
//! artifact server and the object store, and a backend wrapper that injects
//! failures.

#![allow(missing_docs)]

use deck_artifact::{
    AnalysisDocument, AnalysisItem, ArtifactKind, BackendId, NamingScheme, Namespace,
    OverviewDocument, Payload, Round,
};
use deck_store::{ArtifactBackend, BackendError, MemoryBackend, SharedBackend};
use parking_lot::Mutex;
use std::sync::Arc;

/// Analysis document with one item per score
pub fn analysis_doc(categories: &[(&str, &[i64])]) -> AnalysisDocument {
    categories
        .iter()
        .fold(AnalysisDocument::new(), |doc, (category, scores)| {
            scores.iter().enumerate().fold(doc, |doc, (i, score)| {
                doc.with_item(category, AnalysisItem::new(format!("{category} #{i}"), *score, "..."))
            })
        })
}

/// Encoded analysis document
pub fn analysis_json(categories: &[(&str, &[i64])]) -> Payload {
    analysis_doc(categories).to_bytes()
}

/// The Acme deck: Team 40 + Market 80 = 120
pub fn acme_analysis() -> Payload {
    analysis_json(&[("Team", &[40]), ("Market", &[80])])
}

/// Encoded overview document
pub fn overview_json(geography: &str, industry: &str, stage: &str, overall_score: i64) -> Payload {
    OverviewDocument {
        geography: geography.into(),
        industry: industry.into(),
        stage: stage.into(),
        overall_score,
    }
    .to_bytes()
}

/// Placeholder PDF body for a deck
pub fn pdf_bytes(stem: &str) -> Payload {
    format!("%PDF-1.7 {stem}").into_bytes()
}

/// Two in-memory backends registered under the real backend ids
#[derive(Debug, Clone)]
pub struct DeckFixture {
    pub server: Arc<MemoryBackend>,
    pub object_store: Arc<MemoryBackend>,
}

impl Default for DeckFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl DeckFixture {
    pub fn new() -> Self {
        Self {
            server: Arc::new(MemoryBackend::new(BackendId::artifact_server())),
            object_store: Arc::new(MemoryBackend::new(BackendId::object_store())),
        }
    }

    /// Backend by id; anything but the server id maps to the object store
    pub fn memory(&self, backend: &BackendId) -> &Arc<MemoryBackend> {
        if *backend == BackendId::artifact_server() {
            &self.server
        } else {
            &self.object_store
        }
    }

    /// Both backends, server first
    pub fn backends(&self) -> Vec<SharedBackend> {
        vec![self.server.clone(), self.object_store.clone()]
    }

    /// Seed upload, analysis and overview for `stem` in one backend and round
    pub fn seed_deck(&self, backend: &BackendId, round: Round, stem: &str, categories: &[(&str, &[i64])]) -> &Self {
        let upload = format!("{stem}.pdf");
        let mem = self.memory(backend);
        mem.insert(Namespace::new(ArtifactKind::Upload, round), &upload, pdf_bytes(stem));
        mem.insert(
            Namespace::new(ArtifactKind::Analysis, round),
            &NamingScheme::analysis_name(&upload),
            analysis_json(categories),
        );
        mem.insert(
            Namespace::new(ArtifactKind::Overview, round),
            &NamingScheme::overview_name(&upload),
            overview_json("Europe", "Software", "Seed", 7),
        );
        self
    }
}

/// Operation a fault applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    List,
    Get,
    Put,
    Delete,
    DeleteAll,
}

#[derive(Debug, Clone)]
struct Fault {
    op: Op,
    name: Option<String>,
    error: BackendError,
    remaining: Option<usize>,
}

/// Wraps a [`MemoryBackend`] and fails chosen operations
///
/// Faults match on operation and, optionally, artifact name. A fault without
/// a count fires forever.
#[derive(Debug)]
pub struct FaultyBackend {
    inner: MemoryBackend,
    faults: Mutex<Vec<Fault>>,
}

impl FaultyBackend {
    pub fn new(inner: MemoryBackend) -> Self {
        Self {
            inner,
            faults: Mutex::new(Vec::new()),
        }
    }

    /// Fail `op` (for `name`, or any name) with `error` on every call
    pub fn fail(self, op: Op, name: Option<&str>, error: BackendError) -> Self {
        self.push(op, name, error, None)
    }

    /// Fail `op` once, then behave normally
    pub fn fail_once(self, op: Op, name: Option<&str>, error: BackendError) -> Self {
        self.push(op, name, error, Some(1))
    }

    pub fn inner(&self) -> &MemoryBackend {
        &self.inner
    }

    fn push(self, op: Op, name: Option<&str>, error: BackendError, remaining: Option<usize>) -> Self {
        self.faults.lock().push(Fault {
            op,
            name: name.map(str::to_string),
            error,
            remaining,
        });
        self
    }

    fn injected(&self, op: Op, name: Option<&str>) -> Result<(), BackendError> {
        let mut faults = self.faults.lock();
        let hit = faults.iter_mut().position(|f| {
            f.op == op && f.remaining != Some(0) && (f.name.is_none() || f.name.as_deref() == name)
        });
        match hit {
            Some(i) => {
                let fault = &mut faults[i];
                if let Some(n) = fault.remaining.as_mut() {
                    *n -= 1;
                }
                Err(fault.error.clone())
            }
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl ArtifactBackend for FaultyBackend {
    fn id(&self) -> BackendId {
        self.inner.id()
    }

    fn supports(&self, namespace: Namespace) -> bool {
        self.inner.supports(namespace)
    }

    async fn list(&self, namespace: Namespace) -> Result<Vec<String>, BackendError> {
        self.injected(Op::List, None)?;
        self.inner.list(namespace).await
    }

    async fn get(&self, namespace: Namespace, name: &str) -> Result<Payload, BackendError> {
        self.injected(Op::Get, Some(name))?;
        self.inner.get(namespace, name).await
    }

    async fn put(&self, namespace: Namespace, name: &str, payload: Payload) -> Result<(), BackendError> {
        self.injected(Op::Put, Some(name))?;
        self.inner.put(namespace, name, payload).await
    }

    async fn delete(&self, namespace: Namespace, name: &str) -> Result<(), BackendError> {
        self.injected(Op::Delete, Some(name))?;
        self.inner.delete(namespace, name).await
    }

    async fn delete_all(&self, namespace: Namespace) -> Result<usize, BackendError> {
        self.injected(Op::DeleteAll, None)?;
        self.inner.delete_all(namespace).await
    }
}

/// A transport failure as a backend would report it
pub fn transport_error() -> BackendError {
    BackendError::Transport("connection reset by peer".into())
}
