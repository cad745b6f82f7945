//! The asset-fetch capability: how tile payloads and their external
//! resources reach the engine.
//!
//! Everything network-facing sits behind the [`AssetFetcher`] trait so
//! tests can inject in-memory fetchers and the engine never touches a
//! concrete HTTP client. [`ReqwestFetcher`] is the real implementation;
//! [`CachingFetcher`] wraps any fetcher with a size-bounded byte cache
//! that also coalesces concurrent requests for the same URL.

mod cached;
mod http;

pub use cached::CachingFetcher;
pub use http::ReqwestFetcher;

use bytes::Bytes;
use futures::future::BoxFuture;
use thiserror::Error;

/// Errors from the fetch capability.
///
/// `Clone` because a single failed fetch may be observed by several
/// coalesced waiters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssetError {
    /// Could not construct the underlying client.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// The request itself failed (connection, timeout, protocol).
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// A non-success status observed by a layer that requires success.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
}

/// A fetched payload with its HTTP status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResponse {
    pub status: u16,
    pub bytes: Bytes,
}

impl AssetResponse {
    pub fn new(status: u16, bytes: Bytes) -> Self {
        Self { status, bytes }
    }

    /// Whether the status is in the 2xx range. The engine treats
    /// anything else as a fetch failure.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability to fetch a URL's bytes.
///
/// Transport-level failures surface as a failed future; non-success
/// HTTP statuses surface as a successful future whose response fails
/// `is_success()`, so callers decide how to treat them.
pub trait AssetFetcher: Send + Sync {
    /// Fetches the URL with the given request headers.
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<AssetResponse, AssetError>>;
}
