//! Signature-keyed dispatch over the registered content loaders.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use super::{B3dmLoader, ContentLoader, GltfLoader, LoadContext, LoadError, LoadInput, LoadResult};

struct RegistryEntry {
    magic: &'static [u8],
    loader: Arc<dyn ContentLoader>,
}

/// A closed dispatch table keyed by payload signature.
///
/// Formats are recognized by their leading bytes (after skipping ASCII
/// whitespace, so embedded-JSON glTF with a leading newline still
/// dispatches), never by file extension. The registry is explicitly
/// constructed and caller-owned; there is no shared global instance.
pub struct LoaderRegistry {
    entries: Vec<RegistryEntry>,
}

impl LoaderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// A registry with the stock loaders: GLB and JSON glTF via
    /// [`GltfLoader`], b3dm via [`B3dmLoader`].
    pub fn with_default_loaders() -> Self {
        let gltf: Arc<dyn ContentLoader> = Arc::new(GltfLoader::new());
        let mut registry = Self::new();
        registry.register(b"glTF", gltf.clone());
        registry.register(b"{", gltf);
        registry.register(b"b3dm", Arc::new(B3dmLoader::new()));
        registry
    }

    /// Registers a loader for payloads starting with `magic`.
    pub fn register(&mut self, magic: &'static [u8], loader: Arc<dyn ContentLoader>) {
        self.entries.push(RegistryEntry { magic, loader });
    }

    /// Fetches the payload if needed, then dispatches it to the loader
    /// matching its signature.
    ///
    /// An unrecognized signature is malformed content: the result
    /// completes with `model: None` and a diagnostic, it does not fail.
    pub fn dispatch<'a>(
        &'a self,
        ctx: LoadContext<'a>,
        mut input: LoadInput,
    ) -> BoxFuture<'a, Result<LoadResult, LoadError>> {
        Box::pin(async move {
            let bytes = match input.bytes.take() {
                Some(bytes) => bytes,
                None => {
                    let response = ctx.fetcher.fetch(&input.url, &input.headers).await?;
                    if !response.is_success() {
                        return Err(LoadError::Fetch(crate::asset::AssetError::Status {
                            url: input.url.clone(),
                            status: response.status,
                        }));
                    }
                    response.bytes
                }
            };

            let start = bytes
                .iter()
                .position(|b| !b.is_ascii_whitespace())
                .unwrap_or(bytes.len());
            let payload = &bytes[start..];
            let Some(entry) = self
                .entries
                .iter()
                .find(|entry| payload.starts_with(entry.magic))
            else {
                debug!(url = %input.url, "unrecognized content signature");
                return Ok(LoadResult::malformed(
                    vec![format!(
                        "unrecognized content signature in payload from {}",
                        input.url
                    )],
                    input.transform,
                ));
            };

            input.bytes = Some(bytes);
            entry.loader.load(ctx, input).await
        })
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::with_default_loaders()
    }
}
