//! Cloud object store adapter
//!
//! Speaks the bucket/object JSON API used by GCS and Firebase Storage. Each
//! namespace is a flat key prefix; an artifact's key is the prefix followed by
//! its name. Reads resolve object metadata first and then fetch the content,
//! preferring the `mediaLink` locator when the store provides one.

use crate::backend::ArtifactBackend;
use crate::error::BackendError;
use crate::http::{expect_found, expect_success, parse_base};
use crate::layout::object_prefix;
use crate::progress::{chunked, NoProgress, ProgressSink};
use deck_artifact::{BackendId, Namespace, Payload};
use futures::stream::{self, StreamExt};
use reqwest::{Body, Client, RequestBuilder, Url};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default number of concurrent deletes during [`ArtifactBackend::delete_all`]
pub const DEFAULT_DELETE_CONCURRENCY: usize = 8;

#[derive(Debug, Deserialize)]
struct ObjectList {
    #[serde(default)]
    items: Vec<ObjectMeta>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectMeta {
    name: String,
    #[serde(rename = "mediaLink")]
    media_link: Option<String>,
}

/// [`ArtifactBackend`] over a bucket in a cloud object store
#[derive(Debug, Clone)]
pub struct ObjectStoreBackend {
    id: BackendId,
    endpoint: Url,
    bucket: String,
    bearer_token: Option<String>,
    delete_concurrency: usize,
    client: Client,
}

impl ObjectStoreBackend {
    /// Create adapter for `bucket` served at `endpoint`
    ///
    /// # Errors
    /// Returns [`BackendError::InvalidEndpoint`] for an unusable endpoint and
    /// [`BackendError::Transport`] if the client cannot be built.
    pub fn new(endpoint: &str, bucket: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        Ok(Self {
            id: BackendId::object_store(),
            endpoint: parse_base(endpoint)?,
            bucket: bucket.into(),
            bearer_token: None,
            delete_concurrency: DEFAULT_DELETE_CONCURRENCY,
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    /// Authenticate every request with a bearer token
    #[must_use]
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.is_empty());
        self
    }

    /// Override the backend identifier
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: impl Into<BackendId>) -> Self {
        self.id = id.into();
        self
    }

    /// Bound concurrent deletes during a bulk delete
    #[inline]
    #[must_use]
    pub fn with_delete_concurrency(mut self, limit: usize) -> Self {
        self.delete_concurrency = limit.max(1);
        self
    }

    /// Bucket name
    #[inline]
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_key(namespace: Namespace, name: &str) -> String {
        format!("{}{name}", object_prefix(namespace))
    }

    fn endpoint_with(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn objects_url(&self) -> Result<Url, BackendError> {
        self.endpoint_with(&["storage", "v1", "b", &self.bucket, "o"])
    }

    fn object_url(&self, key: &str) -> Result<Url, BackendError> {
        self.endpoint_with(&["storage", "v1", "b", &self.bucket, "o", key])
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn fetch_media(&self, url: Url, namespace: Namespace, name: &str) -> Result<Payload, BackendError> {
        let resp = self.authorized(self.client.get(url)).send().await?;
        let resp = expect_found(resp, namespace, name).await?;
        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait::async_trait]
impl ArtifactBackend for ObjectStoreBackend {
    fn id(&self) -> BackendId {
        self.id.clone()
    }

    fn supports(&self, _namespace: Namespace) -> bool {
        true
    }

    async fn list(&self, namespace: Namespace) -> Result<Vec<String>, BackendError> {
        let prefix = object_prefix(namespace);
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.objects_url()?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("prefix", prefix);
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }
            let resp = self.authorized(self.client.get(url)).send().await?;
            let page: ObjectList = expect_success(resp).await?.json().await?;

            names.extend(page.items.into_iter().filter_map(|meta| {
                let name = meta.name.strip_prefix(prefix)?;
                (!name.is_empty() && !name.contains('/')).then(|| name.to_string())
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(backend = %self.id, %namespace, count = names.len(), "listed");
        Ok(names)
    }

    async fn get(&self, namespace: Namespace, name: &str) -> Result<Payload, BackendError> {
        let url = self.object_url(&Self::object_key(namespace, name))?;
        let resp = self.authorized(self.client.get(url.clone())).send().await?;
        let meta: ObjectMeta = expect_found(resp, namespace, name).await?.json().await?;

        let media = match meta.media_link {
            Some(link) => Url::parse(&link).map_err(|e| BackendError::Decode(format!("mediaLink: {e}")))?,
            None => {
                let mut direct = url;
                direct.query_pairs_mut().append_pair("alt", "media");
                direct
            }
        };
        self.fetch_media(media, namespace, name).await
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
        let key = Self::object_key(namespace, name);
        debug!(backend = %self.id, key = %key, bytes = payload.len(), "put");

        let mut url = self.endpoint_with(&["upload", "storage", "v1", "b", &self.bucket, "o"])?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", &key);

        let resp = self
            .authorized(self.client.post(url))
            .header(reqwest::header::CONTENT_TYPE, namespace.kind.content_type())
            .body(Body::wrap_stream(chunked(payload, progress)))
            .send()
            .await?;
        expect_success(resp).await.map(drop)
    }

    async fn delete(&self, namespace: Namespace, name: &str) -> Result<(), BackendError> {
        let url = self.object_url(&Self::object_key(namespace, name))?;
        let resp = self.authorized(self.client.delete(url)).send().await?;
        expect_found(resp, namespace, name).await?;
        debug!(backend = %self.id, %namespace, name, "deleted");
        Ok(())
    }

    async fn delete_all(&self, namespace: Namespace) -> Result<usize, BackendError> {
        let names = self.list(namespace).await?;
        if names.is_empty() {
            return Ok(0);
        }

        let outcomes: Vec<(String, Result<(), BackendError>)> = stream::iter(names)
            .map(|name| async move {
                let result = self.delete(namespace, &name).await;
                (name, result)
            })
            .buffer_unordered(self.delete_concurrency)
            .collect()
            .await;

        let mut deleted = 0;
        let mut failed = Vec::new();
        for (name, result) in outcomes {
            match result {
                Ok(()) => deleted += 1,
                Err(e) if e.is_not_found() => {
                    debug!(backend = %self.id, %namespace, name = %name, "already gone");
                    deleted += 1;
                }
                Err(e) => {
                    warn!(backend = %self.id, %namespace, name = %name, error = %e, "delete failed");
                    failed.push(name);
                }
            }
        }

        if failed.is_empty() {
            info!(backend = %self.id, %namespace, deleted, "prefix cleared");
            Ok(deleted)
        } else {
            failed.sort();
            Err(BackendError::Incomplete { deleted, failed })
        }
    }
}
