//! The glTF transcoder: raw bytes in, structured [`Model`] out.
//!
//! Accepts both GLB containers (magic `glTF`, version 2, JSON + BIN
//! chunks) and plain JSON glTF. Decoding happens in two phases so the
//! loader can resolve external buffers asynchronously in between:
//!
//! 1. [`read_gltf`] parses the container and JSON structure into a
//!    [`GltfDocument`] and reports any external buffer/image URIs.
//! 2. The caller provides the fetched bytes via
//!    [`GltfDocument::provide_buffer`] / [`GltfDocument::provide_image`]
//!    and calls [`GltfDocument::build_model`] to decode geometry.
//!
//! Malformed payloads never produce an `Err`; both phases report a
//! result value with `model`/`document: None` plus diagnostics.

use std::collections::BTreeSet;

use bytes::Bytes;
use glam::{DMat4, DQuat, DVec3};
use serde::Deserialize;

use super::model::{Buffer, Image, Mesh, Model, Node, Primitive};
use crate::geometry::UpAxis;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_CHUNK_JSON: u32 = 0x4E4F_534A;
const GLB_CHUNK_BIN: u32 = 0x004E_4942;

const COMPONENT_F32: u32 = 5126;

// ============================================================================
// JSON shapes
// ============================================================================

#[derive(Debug, Deserialize, Default)]
struct GltfJson {
    #[serde(default)]
    scene: Option<usize>,
    #[serde(default)]
    scenes: Vec<SceneJson>,
    #[serde(default)]
    nodes: Vec<NodeJson>,
    #[serde(default)]
    meshes: Vec<MeshJson>,
    #[serde(default)]
    accessors: Vec<AccessorJson>,
    #[serde(default, rename = "bufferViews")]
    buffer_views: Vec<BufferViewJson>,
    #[serde(default)]
    buffers: Vec<BufferJson>,
    #[serde(default)]
    images: Vec<ImageJson>,
    #[serde(default)]
    extensions: ExtensionsJson,
}

#[derive(Debug, Deserialize, Default)]
struct SceneJson {
    #[serde(default)]
    nodes: Vec<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct NodeJson {
    #[serde(default)]
    children: Vec<usize>,
    #[serde(default)]
    mesh: Option<usize>,
    #[serde(default)]
    matrix: Option<[f64; 16]>,
    #[serde(default)]
    translation: Option<[f64; 3]>,
    #[serde(default)]
    rotation: Option<[f64; 4]>,
    #[serde(default)]
    scale: Option<[f64; 3]>,
}

#[derive(Debug, Deserialize, Default)]
struct MeshJson {
    #[serde(default)]
    primitives: Vec<PrimitiveJson>,
}

#[derive(Debug, Deserialize, Default)]
struct PrimitiveJson {
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize, Default)]
struct AccessorJson {
    #[serde(default, rename = "bufferView")]
    buffer_view: Option<usize>,
    #[serde(default, rename = "byteOffset")]
    byte_offset: usize,
    #[serde(default, rename = "componentType")]
    component_type: u32,
    #[serde(default)]
    count: usize,
    #[serde(default, rename = "type")]
    accessor_type: String,
}

#[derive(Debug, Deserialize, Default)]
struct BufferViewJson {
    #[serde(default)]
    buffer: usize,
    #[serde(default, rename = "byteOffset")]
    byte_offset: usize,
    #[serde(default, rename = "byteLength")]
    byte_length: usize,
    #[serde(default, rename = "byteStride")]
    byte_stride: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct BufferJson {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default, rename = "byteLength")]
    byte_length: usize,
}

#[derive(Debug, Deserialize, Default)]
struct ImageJson {
    #[serde(default)]
    uri: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ExtensionsJson {
    #[serde(default, rename = "CESIUM_RTC")]
    cesium_rtc: Option<CesiumRtcJson>,
}

#[derive(Debug, Deserialize, Default)]
struct CesiumRtcJson {
    #[serde(default)]
    center: [f64; 3],
}

// ============================================================================
// Public surface
// ============================================================================

/// Outcome of the structural parse phase.
#[derive(Debug, Default)]
pub struct GltfReadResult {
    /// The parsed document, absent when the payload was malformed.
    pub document: Option<GltfDocument>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// A reference to a resource the document needs fetched externally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalResource {
    Buffer { index: usize, uri: String },
    Image { index: usize, uri: String },
}

/// A structurally parsed glTF awaiting buffer resolution.
#[derive(Debug)]
pub struct GltfDocument {
    json: GltfJson,
    buffer_data: Vec<Option<Bytes>>,
    image_data: Vec<Option<Bytes>>,
    up_axis: UpAxis,
}

impl GltfDocument {
    /// External buffers and images that still need their bytes.
    ///
    /// Data URIs are reported as warnings at parse time, not here.
    pub fn external_resources(&self) -> Vec<ExternalResource> {
        let mut resources = Vec::new();
        for (index, buffer) in self.json.buffers.iter().enumerate() {
            if self.buffer_data[index].is_none() {
                if let Some(uri) = &buffer.uri {
                    if !uri.starts_with("data:") {
                        resources.push(ExternalResource::Buffer {
                            index,
                            uri: uri.clone(),
                        });
                    }
                }
            }
        }
        for (index, image) in self.json.images.iter().enumerate() {
            if self.image_data[index].is_none() {
                if let Some(uri) = &image.uri {
                    if !uri.starts_with("data:") {
                        resources.push(ExternalResource::Image {
                            index,
                            uri: uri.clone(),
                        });
                    }
                }
            }
        }
        resources
    }

    /// Supplies the bytes for an external buffer.
    pub fn provide_buffer(&mut self, index: usize, data: Bytes) {
        if let Some(slot) = self.buffer_data.get_mut(index) {
            *slot = Some(data);
        }
    }

    /// Supplies the bytes for an external image.
    pub fn provide_image(&mut self, index: usize, data: Bytes) {
        if let Some(slot) = self.image_data.get_mut(index) {
            *slot = Some(data);
        }
    }

    /// Decodes geometry and builds the final [`Model`].
    ///
    /// Unresolvable pieces degrade to warnings (a primitive without
    /// decodable positions simply has none); the result is `None` only
    /// when the document itself was structurally unusable, which the
    /// parse phase already guards against.
    pub fn build_model(self) -> (Model, Vec<String>) {
        let mut warnings = Vec::new();

        let scene_index = self.json.scene.unwrap_or(0);
        let scene_nodes = self
            .json
            .scenes
            .get(scene_index)
            .map(|s| s.nodes.clone())
            .unwrap_or_default();

        let nodes = self.json.nodes.iter().map(node_from_json).collect();

        let mut meshes = Vec::with_capacity(self.json.meshes.len());
        for (mesh_index, mesh) in self.json.meshes.iter().enumerate() {
            let mut primitives = Vec::with_capacity(mesh.primitives.len());
            for (prim_index, prim) in mesh.primitives.iter().enumerate() {
                let attributes: BTreeSet<String> = prim.attributes.keys().cloned().collect();
                let positions = match prim.attributes.get("POSITION").and_then(|v| v.as_u64()) {
                    Some(accessor) => match self.read_vec3_accessor(accessor as usize) {
                        Ok(positions) => positions,
                        Err(reason) => {
                            warnings.push(format!(
                                "mesh {} primitive {}: cannot decode POSITION: {}",
                                mesh_index, prim_index, reason
                            ));
                            Vec::new()
                        }
                    },
                    None => Vec::new(),
                };
                primitives.push(Primitive {
                    positions,
                    attributes,
                    overlay_uvs: Vec::new(),
                });
            }
            meshes.push(Mesh { primitives });
        }

        let buffers = self
            .json
            .buffers
            .iter()
            .zip(&self.buffer_data)
            .map(|(json, data)| Buffer {
                uri: json.uri.clone(),
                data: data.clone(),
            })
            .collect();
        let images = self
            .json
            .images
            .iter()
            .zip(&self.image_data)
            .map(|(json, data)| Image {
                uri: json.uri.clone(),
                data: data.clone(),
            })
            .collect();

        let rtc_center = self.json.extensions.cesium_rtc.as_ref().map(|rtc| {
            DVec3::new(rtc.center[0], rtc.center[1], rtc.center[2])
        });

        let model = Model {
            buffers,
            images,
            nodes,
            meshes,
            scene_nodes,
            rtc_center,
            up_axis: self.up_axis,
        };
        (model, warnings)
    }

    /// Reads a float VEC3 accessor into positions, honoring bufferView
    /// strides.
    fn read_vec3_accessor(&self, index: usize) -> Result<Vec<DVec3>, String> {
        let accessor = self
            .json
            .accessors
            .get(index)
            .ok_or_else(|| format!("accessor {} out of range", index))?;
        if accessor.component_type != COMPONENT_F32 || accessor.accessor_type != "VEC3" {
            return Err(format!(
                "unsupported accessor layout {}/{}",
                accessor.component_type, accessor.accessor_type
            ));
        }
        let view_index = accessor
            .buffer_view
            .ok_or_else(|| "accessor has no bufferView".to_string())?;
        let view = self
            .json
            .buffer_views
            .get(view_index)
            .ok_or_else(|| format!("bufferView {} out of range", view_index))?;
        let data = self
            .buffer_data
            .get(view.buffer)
            .and_then(|d| d.as_ref())
            .ok_or_else(|| format!("buffer {} has no data", view.buffer))?;

        let stride = view.byte_stride.unwrap_or(12);
        if stride < 12 {
            return Err(format!("byteStride {} too small for VEC3 floats", stride));
        }
        // All sizes come straight from the payload; checked arithmetic
        // keeps a hostile count/offset from wrapping past the bounds
        // test below.
        let out_of_bounds = || "accessor reads past end of buffer".to_string();
        let base = view
            .byte_offset
            .checked_add(accessor.byte_offset)
            .ok_or_else(out_of_bounds)?;
        let needed = match accessor.count.checked_sub(1) {
            None => 0,
            Some(last) => last
                .checked_mul(stride)
                .and_then(|bytes| bytes.checked_add(12))
                .ok_or_else(out_of_bounds)?,
        };
        let in_bounds = base.checked_add(needed).is_some_and(|end| end <= data.len())
            && view
                .byte_offset
                .checked_add(view.byte_length)
                .is_some_and(|end| end <= data.len());
        if !in_bounds {
            return Err(out_of_bounds());
        }

        let mut positions = Vec::with_capacity(accessor.count);
        for i in 0..accessor.count {
            let at = base + i * stride;
            let x = f32::from_le_bytes(data[at..at + 4].try_into().unwrap());
            let y = f32::from_le_bytes(data[at + 4..at + 8].try_into().unwrap());
            let z = f32::from_le_bytes(data[at + 8..at + 12].try_into().unwrap());
            positions.push(DVec3::new(x as f64, y as f64, z as f64));
        }
        Ok(positions)
    }
}

fn node_from_json(node: &NodeJson) -> Node {
    let transform = if let Some(m) = node.matrix {
        DMat4::from_cols_array(&m)
    } else {
        let translation = node
            .translation
            .map(DVec3::from_array)
            .unwrap_or(DVec3::ZERO);
        let rotation = node
            .rotation
            .map(|q| DQuat::from_xyzw(q[0], q[1], q[2], q[3]))
            .unwrap_or(DQuat::IDENTITY);
        let scale = node.scale.map(DVec3::from_array).unwrap_or(DVec3::ONE);
        DMat4::from_scale_rotation_translation(scale, rotation, translation)
    };
    Node {
        transform,
        mesh: node.mesh,
        children: node.children.clone(),
    }
}

/// Parses a GLB container or plain JSON glTF payload.
///
/// The declared up-axis is a container-level convention (3D Tiles
/// declares it in tileset.json, not inside the glTF), so the caller
/// passes it in.
pub fn read_gltf(bytes: &Bytes, up_axis: UpAxis) -> GltfReadResult {
    let mut result = GltfReadResult::default();

    let (json_slice, bin_chunk) = if bytes.len() >= 4 && &bytes[0..4] == GLB_MAGIC {
        match split_glb(bytes) {
            Ok(parts) => parts,
            Err(error) => {
                result.errors.push(error);
                return result;
            }
        }
    } else {
        (bytes.clone(), None)
    };

    let json: GltfJson = match serde_json::from_slice(&json_slice) {
        Ok(json) => json,
        Err(error) => {
            result.errors.push(format!("invalid glTF JSON: {}", error));
            return result;
        }
    };

    let mut buffer_data: Vec<Option<Bytes>> = vec![None; json.buffers.len()];
    // The GLB BIN chunk is buffer 0 when that buffer declares no URI.
    if let Some(bin) = bin_chunk {
        match json.buffers.first() {
            Some(buffer) if buffer.uri.is_none() => buffer_data[0] = Some(bin),
            _ => result
                .warnings
                .push("GLB has a BIN chunk but buffer 0 declares a URI".to_string()),
        }
    }
    for (index, buffer) in json.buffers.iter().enumerate() {
        if let Some(uri) = &buffer.uri {
            if uri.starts_with("data:") {
                result
                    .warnings
                    .push(format!("buffer {}: data URIs are not supported", index));
            }
        } else if buffer_data[index].is_none() {
            result.warnings.push(format!(
                "buffer {} has neither a URI nor embedded data",
                index
            ));
        }
    }

    let image_data = vec![None; json.images.len()];
    result.document = Some(GltfDocument {
        json,
        buffer_data,
        image_data,
        up_axis,
    });
    result
}

/// Splits a GLB container into its JSON chunk and optional BIN chunk.
fn split_glb(bytes: &Bytes) -> Result<(Bytes, Option<Bytes>), String> {
    if bytes.len() < 12 {
        return Err("GLB shorter than its 12-byte header".to_string());
    }
    let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    if version != 2 {
        return Err(format!("unsupported GLB version {}", version));
    }

    let mut json_chunk = None;
    let mut bin_chunk = None;
    let mut offset = 12usize;
    while offset + 8 <= bytes.len() {
        let length =
            u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap()) as usize;
        let kind = u32::from_le_bytes(bytes[offset + 4..offset + 8].try_into().unwrap());
        offset += 8;
        if offset + length > bytes.len() {
            return Err("GLB chunk runs past end of payload".to_string());
        }
        let chunk = bytes.slice(offset..offset + length);
        match kind {
            GLB_CHUNK_JSON => json_chunk = Some(chunk),
            GLB_CHUNK_BIN => bin_chunk = Some(chunk),
            _ => {}
        }
        offset += length;
    }

    json_chunk
        .map(|json| (json, bin_chunk))
        .ok_or_else(|| "GLB has no JSON chunk".to_string())
}
