//! Byte-level progress reporting for writes

use deck_artifact::Payload;
use futures::stream::{self, Stream};
use std::sync::Arc;

/// Chunk size used when streaming a payload to a backend
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Receives `(sent, total)` byte counts while a payload is written
pub trait ProgressSink: Send + Sync {
    /// Report progress; `sent` never decreases within one write
    fn report(&self, sent: u64, total: u64);
}

impl<F> ProgressSink for F
where
    F: Fn(u64, u64) + Send + Sync,
{
    fn report(&self, sent: u64, total: u64) {
        self(sent, total);
    }
}

/// Sink that discards every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _sent: u64, _total: u64) {}
}

/// Split a payload into a body stream that reports each chunk as it is taken
pub(crate) fn chunked(
    payload: Payload,
    progress: Arc<dyn ProgressSink>,
) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> + Send + 'static {
    let total = payload.len() as u64;
    progress.report(0, total);
    let chunks: Vec<Vec<u8>> = payload.chunks(UPLOAD_CHUNK_SIZE).map(<[u8]>::to_vec).collect();
    let mut sent = 0u64;
    stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len() as u64;
        progress.report(sent, total);
        Ok(chunk)
    }))
}
