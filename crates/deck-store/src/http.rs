//! Remote artifact server adapter
//!
//! Every operation is one request against `/api/{collection}`. Round-1 uploads
//! are the exception on the write path: the server only accepts them as a
//! multipart form on `/api/upload`.

use crate::backend::ArtifactBackend;
use crate::error::BackendError;
use crate::layout::http_collection;
use crate::progress::{chunked, NoProgress, ProgressSink};
use deck_artifact::{ArtifactKind, BackendId, Namespace, Payload};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response, StatusCode, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// [`ArtifactBackend`] over the artifact server's HTTP API
#[derive(Debug, Clone)]
pub struct HttpBackend {
    id: BackendId,
    base_url: Url,
    client: Client,
}

impl HttpBackend {
    /// Create adapter for a server root such as `http://localhost:5000`
    ///
    /// # Errors
    /// Returns [`BackendError::InvalidEndpoint`] if the URL cannot be parsed
    /// or used as a base, and [`BackendError::Transport`] if the client
    /// cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = parse_base(base_url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            id: BackendId::artifact_server(),
            base_url,
            client,
        })
    }

    /// Override the backend identifier
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: impl Into<BackendId>) -> Self {
        self.id = id.into();
        self
    }

    /// Server root
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn collection(&self, namespace: Namespace) -> Result<&'static str, BackendError> {
        http_collection(namespace).ok_or_else(|| BackendError::Unsupported {
            backend: self.id.clone(),
            namespace,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidEndpoint(self.base_url.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn upload_form(
        &self,
        name: &str,
        payload: Payload,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<(), BackendError> {
        let len = payload.len() as u64;
        let body = Body::wrap_stream(chunked(payload, progress));
        let file = Part::stream_with_length(body, len)
            .file_name(name.to_string())
            .mime_str(ArtifactKind::Upload.content_type())?;
        let form = Form::new().part("file", file).text("fileName", name.to_string());

        let resp = self
            .client
            .post(self.url(&["upload"])?)
            .multipart(form)
            .send()
            .await?;
        expect_success(resp).await.map(drop)
    }
}

#[async_trait::async_trait]
impl ArtifactBackend for HttpBackend {
    fn id(&self) -> BackendId {
        self.id.clone()
    }

    fn supports(&self, namespace: Namespace) -> bool {
        http_collection(namespace).is_some()
    }

    async fn list(&self, namespace: Namespace) -> Result<Vec<String>, BackendError> {
        let collection = self.collection(namespace)?;
        let resp = self.client.get(self.url(&[collection])?).send().await?;
        let body: Value = expect_success(resp).await?.json().await?;
        let names = parse_listing(body)?;
        debug!(backend = %self.id, %namespace, count = names.len(), "listed");
        Ok(names)
    }

    async fn get(&self, namespace: Namespace, name: &str) -> Result<Payload, BackendError> {
        let collection = self.collection(namespace)?;
        let resp = self.client.get(self.url(&[collection, name])?).send().await?;
        let resp = expect_found(resp, namespace, name).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn put(
        &self,
        namespace: Namespace,
        name: &str,
        payload: Payload,
    ) -> Result<(), BackendError> {
        self.put_with_progress(namespace, name, payload, Arc::new(NoProgress))
            .await
    }

    async fn put_with_progress(
        &self,
        namespace: Namespace,
        name: &str,
        payload: Payload,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<(), BackendError> {
        let collection = self.collection(namespace)?;
        debug!(backend = %self.id, %namespace, name, bytes = payload.len(), "put");

        if namespace == Namespace::round_one(ArtifactKind::Upload) {
            return self.upload_form(name, payload, progress).await;
        }

        let resp = self
            .client
            .put(self.url(&[collection, name])?)
            .header(reqwest::header::CONTENT_TYPE, namespace.kind.content_type())
            .body(Body::wrap_stream(chunked(payload, progress)))
            .send()
            .await?;
        expect_success(resp).await.map(drop)
    }

    async fn delete(&self, namespace: Namespace, name: &str) -> Result<(), BackendError> {
        let collection = self.collection(namespace)?;
        let resp = self.client.delete(self.url(&[collection, name])?).send().await?;
        expect_found(resp, namespace, name).await?;
        debug!(backend = %self.id, %namespace, name, "deleted");
        Ok(())
    }

    async fn delete_all(&self, namespace: Namespace) -> Result<usize, BackendError> {
        let names = self.list(namespace).await?;
        if names.is_empty() {
            return Ok(0);
        }
        let collection = self.collection(namespace)?;
        let resp = self.client.delete(self.url(&[collection])?).send().await?;
        expect_success(resp).await?;
        info!(backend = %self.id, %namespace, deleted = names.len(), "collection cleared");
        Ok(names.len())
    }
}

pub(crate) fn parse_base(raw: &str) -> Result<Url, BackendError> {
    let url = Url::parse(raw).map_err(|e| BackendError::InvalidEndpoint(format!("{raw}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(BackendError::InvalidEndpoint(raw.to_string()));
    }
    Ok(url)
}

/// Accepts a bare array of names or `{"filenames": [...]}`
fn parse_listing(body: Value) -> Result<Vec<String>, BackendError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("filenames") {
            Some(Value::Array(items)) => items,
            _ => return Err(BackendError::Decode("listing object without 'filenames'".into())),
        },
        other => return Err(BackendError::Decode(format!("unexpected listing: {other}"))),
    };
    Ok(items
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect())
}

/// Pass a 2xx response through; anything else becomes
/// [`BackendError::Status`] carrying the response body
///
/// # Errors
/// Non-success status
pub async fn expect_success(resp: Response) -> Result<Response, BackendError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(BackendError::Status { status, body })
}

pub(crate) async fn expect_found(
    resp: Response,
    namespace: Namespace,
    name: &str,
) -> Result<Response, BackendError> {
    if resp.status() == StatusCode::NOT_FOUND {
        return Err(BackendError::not_found(namespace, name));
    }
    expect_success(resp).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn listing_shapes() {
        assert_eq!(parse_listing(json!(["a.pdf", "b.pdf"])).unwrap(), vec!["a.pdf", "b.pdf"]);
        assert_eq!(parse_listing(json!({"filenames": ["a.pdf"]})).unwrap(), vec!["a.pdf"]);
        assert_eq!(parse_listing(json!(["a.pdf", 3, null])).unwrap(), vec!["a.pdf"]);
        assert!(parse_listing(json!({"files": []})).is_err());
        assert!(parse_listing(json!("a.pdf")).is_err());
    }

    #[test]
    fn url_segments_are_encoded() {
        let backend = HttpBackend::new("http://localhost:5000/", Duration::from_secs(1)).unwrap();
        let url = backend.url(&["uploads", "Acme Seed.pdf"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/uploads/Acme%20Seed.pdf");
    }

    #[test]
    fn round_two_overview_is_unsupported() {
        let backend = HttpBackend::new("http://localhost:5000", Duration::from_secs(1)).unwrap();
        assert!(!backend.supports(Namespace::round_two(ArtifactKind::Overview)));
        assert!(backend.supports(Namespace::PROMOTED_UPLOADS));
    }

    #[test]
    fn rejects_unusable_base() {
        assert!(HttpBackend::new("not a url", Duration::from_secs(1)).is_err());
        assert!(HttpBackend::new("mailto:ops@example.com", Duration::from_secs(1)).is_err());
    }
}
