//! Deck Storage Backends
//!
//! One uniform adapter contract, [`ArtifactBackend`], implemented for each
//! physical storage target:
//!
//! - [`HttpBackend`]: the first-party artifact server (`/api/{collection}`)
//! - [`ObjectStoreBackend`]: a bucket in a hosted object store
//! - [`MemoryBackend`]: an in-process map for tests and dry runs
//!
//! Backends are independent collections, not replicas. Nothing here keeps
//! them in sync.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod backend;
mod error;
mod http;
pub mod layout;
mod memory;
mod object_store;
mod progress;

pub use backend::{ArtifactBackend, SharedBackend};
pub use error::BackendError;
pub use http::{expect_success, HttpBackend};
pub use memory::MemoryBackend;
pub use object_store::{ObjectStoreBackend, DEFAULT_DELETE_CONCURRENCY};
pub use progress::{NoProgress, ProgressSink, UPLOAD_CHUNK_SIZE};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
