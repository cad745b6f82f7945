//! Size-bounded byte cache over any fetcher.

use bytes::Bytes;
use futures::future::BoxFuture;
use moka::future::Cache;
use tracing::trace;

use super::{AssetError, AssetFetcher, AssetResponse};

/// Wraps a fetcher with an LRU byte cache keyed by URL.
///
/// Only successful responses are cached; a cached hit replays with
/// status 200. Concurrent fetches of the same URL are coalesced into
/// one request by moka, so N waiters cost one network round trip.
/// Because the key is the URL alone, this layer converts non-success
/// statuses into [`AssetError::Status`] rather than letting per-request
/// header variations produce divergent cache entries.
pub struct CachingFetcher<F> {
    inner: F,
    cache: Cache<String, Bytes>,
}

impl<F: AssetFetcher> CachingFetcher<F> {
    /// Creates a cache holding at most `max_size_bytes` of payload.
    pub fn new(inner: F, max_size_bytes: u64) -> Self {
        let cache = Cache::builder()
            .weigher(|_key: &String, value: &Bytes| -> u32 {
                value.len().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .build();
        Self { inner, cache }
    }

    /// Number of entries currently cached. Moka maintains this lazily,
    /// so tests should call `run_pending_tasks` on the cache first.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl<F: AssetFetcher> AssetFetcher for CachingFetcher<F> {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<AssetResponse, AssetError>> {
        Box::pin(async move {
            let bytes = self
                .cache
                .try_get_with(url.to_string(), async {
                    trace!(url, "cache miss, fetching");
                    let response = self.inner.fetch(url, headers).await?;
                    if !response.is_success() {
                        return Err(AssetError::Status {
                            url: url.to_string(),
                            status: response.status,
                        });
                    }
                    Ok(response.bytes)
                })
                .await
                .map_err(|e: std::sync::Arc<AssetError>| (*e).clone())?;

            Ok(AssetResponse::new(200, bytes))
        })
    }
}
