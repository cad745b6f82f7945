//! Shared helpers for CLI commands.

use std::sync::Arc;

use futures::future::BoxFuture;
use glam::DVec3;
use terrastream::asset::{AssetError, AssetFetcher, AssetResponse, CachingFetcher, ReqwestFetcher};
use terrastream::geometry::{Cartographic, Ellipsoid};
use terrastream::select::ViewState;
use tracing::debug;

use crate::error::CliError;

/// Serves `http(s)` URLs over the network and everything else from the
/// local filesystem, so a tileset directory on disk works unchanged.
pub struct UniversalFetcher {
    http: ReqwestFetcher,
}

impl UniversalFetcher {
    pub fn new() -> Result<Self, AssetError> {
        Ok(Self {
            http: ReqwestFetcher::new()?,
        })
    }
}

impl AssetFetcher for UniversalFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<AssetResponse, AssetError>> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return self.http.fetch(url, headers);
        }
        Box::pin(async move {
            let path = url.strip_prefix("file://").unwrap_or(url);
            match std::fs::read(path) {
                Ok(bytes) => {
                    debug!(path, size = bytes.len(), "read local asset");
                    Ok(AssetResponse::new(200, bytes.into()))
                }
                Err(e) => Err(AssetError::Transport {
                    url: url.to_string(),
                    reason: e.to_string(),
                }),
            }
        })
    }
}

/// Payload bytes kept in the CLI's fetch cache.
const FETCH_CACHE_BYTES: u64 = 256 * 1024 * 1024;

/// Build the shared fetcher: a byte cache over network/file access, so
/// resources referenced by many tiles are fetched once per run.
pub fn build_fetcher() -> Result<Arc<dyn AssetFetcher>, CliError> {
    let fetcher = UniversalFetcher::new().map_err(|e| CliError::Fetch {
        url: String::new(),
        reason: e.to_string(),
    })?;
    Ok(Arc::new(CachingFetcher::new(fetcher, FETCH_CACHE_BYTES)))
}

/// Fetch one URL to completion on the current runtime.
pub async fn fetch_bytes(
    fetcher: &dyn AssetFetcher,
    url: &str,
) -> Result<bytes::Bytes, CliError> {
    let response = fetcher
        .fetch(url, &[])
        .await
        .map_err(|e| CliError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    if !response.is_success() {
        return Err(CliError::Fetch {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status),
        });
    }
    Ok(response.bytes)
}

/// A nadir-looking camera hovering over a geodetic position.
///
/// Longitude and latitude are taken in degrees; height in meters above
/// the WGS84 ellipsoid.
pub fn nadir_view(
    longitude_deg: f64,
    latitude_deg: f64,
    height: f64,
    viewport_width: f64,
    viewport_height: f64,
    fov_y_deg: f64,
) -> ViewState {
    let position = Ellipsoid::WGS84.cartographic_to_cartesian(&Cartographic::new(
        longitude_deg.to_radians(),
        latitude_deg.to_radians(),
        height,
    ));
    let direction = -position.normalize();
    // Use the pole as the up hint unless we are looking along it.
    let up = if direction.cross(DVec3::Z).length_squared() > 1e-12 {
        DVec3::Z
    } else {
        DVec3::X
    };
    ViewState::new(
        position,
        direction,
        up,
        viewport_width,
        viewport_height,
        fov_y_deg.to_radians(),
    )
}
