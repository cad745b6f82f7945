//! HTTP fetcher backed by reqwest.

use std::time::Duration;

use futures::future::BoxFuture;
use tracing::debug;

use super::{AssetError, AssetFetcher, AssetResponse};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The real network fetcher.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Creates a fetcher with the default 30-second timeout.
    pub fn new() -> Result<Self, AssetError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a fetcher with a custom request timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, AssetError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AssetError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl AssetFetcher for ReqwestFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<AssetResponse, AssetError>> {
        Box::pin(async move {
            let mut request = self.client.get(url);
            for (name, value) in headers {
                request = request.header(name, value);
            }

            let response = request.send().await.map_err(|e| AssetError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

            let status = response.status().as_u16();
            let bytes = response.bytes().await.map_err(|e| AssetError::Transport {
                url: url.to_string(),
                reason: format!("failed to read body: {}", e),
            })?;

            debug!(url, status, len = bytes.len(), "fetched asset");
            Ok(AssetResponse::new(status, bytes))
        })
    }
}
