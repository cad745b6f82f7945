//! The reference content loader: glTF and GLB payloads.

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::future::try_join_all;
use glam::DVec3;
use tracing::debug;

use super::{resolve_relative, ContentLoader, LoadContext, LoadError, LoadInput, LoadResult};
use crate::gltf::reader::{read_gltf, ExternalResource};
use crate::gltf::{
    apply_rtc_center, apply_up_axis_transform, compute_bounding_region,
    generate_overlay_texture_coordinates,
};

/// Loads glTF content: decode, resolve external resources, normalize
/// transforms, derive the bounding region, generate overlay UVs.
#[derive(Default)]
pub struct GltfLoader;

impl GltfLoader {
    pub fn new() -> Self {
        Self
    }

    /// The full load chain, with an optional origin offset injected by
    /// a container format (b3dm feature tables declare one outside the
    /// glTF itself). An offset already present in the glTF wins.
    pub(crate) async fn load_with_rtc(
        &self,
        ctx: LoadContext<'_>,
        input: LoadInput,
        container_rtc: Option<DVec3>,
    ) -> Result<LoadResult, LoadError> {
        let bytes = match input.bytes.clone() {
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

        let parse = read_gltf(&bytes, input.options.up_axis);
        let mut diagnostics = parse.errors;
        diagnostics.extend(parse.warnings);
        let Some(mut document) = parse.document else {
            debug!(url = %input.url, "malformed glTF payload");
            return Ok(LoadResult::malformed(diagnostics, input.transform));
        };

        // Resolve external buffers and images through the same fetch
        // capability the tile itself came through.
        let externals = document.external_resources();
        if !externals.is_empty() {
            let fetches = externals.iter().map(|resource| {
                let uri = match resource {
                    ExternalResource::Buffer { uri, .. } => uri.clone(),
                    ExternalResource::Image { uri, .. } => uri.clone(),
                };
                let url = resolve_relative(&input.url, &uri);
                let headers = &input.headers;
                async move {
                    let response = ctx
                        .fetcher
                        .fetch(&url, headers)
                        .await
                        .map_err(|source| LoadError::ExternalResource {
                            uri: uri.clone(),
                            source,
                        })?;
                    if !response.is_success() {
                        return Err(LoadError::ExternalResource {
                            uri: uri.clone(),
                            source: crate::asset::AssetError::Status {
                                url,
                                status: response.status,
                            },
                        });
                    }
                    Ok::<Bytes, LoadError>(response.bytes)
                }
            });
            let resolved = try_join_all(fetches).await?;
            for (resource, data) in externals.iter().zip(resolved) {
                match resource {
                    ExternalResource::Buffer { index, .. } => {
                        document.provide_buffer(*index, data)
                    }
                    ExternalResource::Image { index, .. } => document.provide_image(*index, data),
                }
            }
        }

        let (mut model, warnings) = document.build_model();
        diagnostics.extend(warnings);
        if model.rtc_center.is_none() {
            model.rtc_center = container_rtc;
        }

        let transform =
            apply_up_axis_transform(&model, &apply_rtc_center(&model, &input.transform));

        let computed_region = if input.options.generate_bounding_region {
            compute_bounding_region(&model, &transform)
        } else {
            None
        };

        let overlay = if input.options.overlay_projections.is_empty() {
            None
        } else {
            generate_overlay_texture_coordinates(
                &mut model,
                &transform,
                input.options.overlay_first_channel,
                computed_region.map(|r| r.rectangle),
                &input.options.overlay_projections,
            )
        };

        Ok(LoadResult {
            model: Some(model),
            diagnostics,
            transform,
            computed_region,
            overlay,
        })
    }
}

impl ContentLoader for GltfLoader {
    fn load<'a>(
        &'a self,
        ctx: LoadContext<'a>,
        input: LoadInput,
    ) -> BoxFuture<'a, Result<LoadResult, LoadError>> {
        Box::pin(self.load_with_rtc(ctx, input, None))
    }
}
