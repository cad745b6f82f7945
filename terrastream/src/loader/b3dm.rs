//! Batched 3D Model (b3dm) loader: a 28-byte header, feature and
//! batch tables, then an embedded GLB.

use futures::future::BoxFuture;
use glam::DVec3;

use super::{ContentLoader, GltfLoader, LoadContext, LoadError, LoadInput, LoadResult};

const HEADER_LEN: usize = 28;

struct B3dmHeader {
    version: u32,
    byte_length: u32,
    feature_table_json_len: u32,
    feature_table_binary_len: u32,
    batch_table_json_len: u32,
    batch_table_binary_len: u32,
}

impl B3dmHeader {
    fn parse(data: &[u8]) -> Result<Self, String> {
        if data.len() < HEADER_LEN {
            return Err("payload shorter than the 28-byte b3dm header".to_string());
        }
        if &data[0..4] != b"b3dm" {
            return Err("payload does not start with the b3dm magic".to_string());
        }
        let word = |at: usize| u32::from_le_bytes(data[at..at + 4].try_into().unwrap());
        Ok(Self {
            version: word(4),
            byte_length: word(8),
            feature_table_json_len: word(12),
            feature_table_binary_len: word(16),
            batch_table_json_len: word(20),
            batch_table_binary_len: word(24),
        })
    }

    fn glb_offset(&self) -> usize {
        HEADER_LEN
            + self.feature_table_json_len as usize
            + self.feature_table_binary_len as usize
            + self.batch_table_json_len as usize
            + self.batch_table_binary_len as usize
    }
}

/// Wraps [`GltfLoader`], unwrapping the container and forwarding the
/// feature table's `RTC_CENTER` as the origin offset.
#[derive(Default)]
pub struct B3dmLoader {
    gltf: GltfLoader,
}

impl B3dmLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentLoader for B3dmLoader {
    fn load<'a>(
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

            let header = match B3dmHeader::parse(&bytes) {
                Ok(header) => header,
                Err(reason) => {
                    return Ok(LoadResult::malformed(vec![reason], input.transform));
                }
            };
            if header.version != 1 {
                return Ok(LoadResult::malformed(
                    vec![format!("unsupported b3dm version {}", header.version)],
                    input.transform,
                ));
            }
            if header.byte_length as usize > bytes.len() || header.glb_offset() > bytes.len() {
                return Ok(LoadResult::malformed(
                    vec!["b3dm tables run past the end of the payload".to_string()],
                    input.transform,
                ));
            }

            let mut diagnostics = Vec::new();
            let rtc_center = parse_rtc_center(
                &bytes[HEADER_LEN..HEADER_LEN + header.feature_table_json_len as usize],
                &mut diagnostics,
            );

            input.bytes = Some(bytes.slice(header.glb_offset()..));
            let mut result = self.gltf.load_with_rtc(ctx, input, rtc_center).await?;
            result.diagnostics.splice(0..0, diagnostics);
            Ok(result)
        })
    }
}

/// Reads `RTC_CENTER` from the feature table JSON. Only the inline
/// three-element form is supported; a binary-body reference is
/// reported as a diagnostic and ignored.
fn parse_rtc_center(feature_table_json: &[u8], diagnostics: &mut Vec<String>) -> Option<DVec3> {
    if feature_table_json.is_empty() {
        return None;
    }
    let table: serde_json::Value = match serde_json::from_slice(feature_table_json) {
        Ok(table) => table,
        Err(error) => {
            diagnostics.push(format!("invalid feature table JSON: {}", error));
            return None;
        }
    };
    match table.get("RTC_CENTER") {
        None => None,
        Some(value) => match value.as_array().and_then(|a| {
            if a.len() == 3 {
                Some(DVec3::new(a[0].as_f64()?, a[1].as_f64()?, a[2].as_f64()?))
            } else {
                None
            }
        }) {
            Some(center) => Some(center),
            None => {
                diagnostics
                    .push("RTC_CENTER is not an inline [x, y, z] array; ignored".to_string());
                None
            }
        },
    }
}
