//! The decoded scene-graph model that loaders produce and the
//! renderer consumes.

use std::collections::BTreeSet;

use bytes::Bytes;
use glam::{DMat4, DVec2, DVec3};

use crate::geometry::UpAxis;

/// A buffer slot. `data` is present once the payload is embedded or
/// an external fetch has been resolved.
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    pub uri: Option<String>,
    pub data: Option<Bytes>,
}

/// An image slot, resolved the same way buffers are.
#[derive(Debug, Clone, Default)]
pub struct Image {
    pub uri: Option<String>,
    pub data: Option<Bytes>,
}

/// A node in the scene hierarchy.
#[derive(Debug, Clone)]
pub struct Node {
    /// Local transform relative to the parent node.
    pub transform: DMat4,
    pub mesh: Option<usize>,
    pub children: Vec<usize>,
}

/// A generated overlay texture-coordinate set for one primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayUvSet {
    /// Attribute channel name, e.g. `_OVERLAY_0`.
    pub attribute: String,
    pub uv: Vec<DVec2>,
}

/// One drawable primitive of a mesh.
#[derive(Debug, Clone, Default)]
pub struct Primitive {
    /// Decoded vertex positions in model space.
    pub positions: Vec<DVec3>,
    /// Names of attribute channels the primitive carries.
    pub attributes: BTreeSet<String>,
    /// Overlay UV sets generated after load.
    pub overlay_uvs: Vec<OverlayUvSet>,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub primitives: Vec<Primitive>,
}

/// A decoded scene graph.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub buffers: Vec<Buffer>,
    pub images: Vec<Image>,
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    /// Root nodes of the default scene.
    pub scene_nodes: Vec<usize>,
    /// Local-origin offset declared by the `CESIUM_RTC` extension.
    pub rtc_center: Option<DVec3>,
    /// Up-axis convention the model was authored in.
    pub up_axis: UpAxis,
}

impl Model {
    /// Visits every primitive reachable from the default scene with
    /// its accumulated node transform.
    pub fn for_each_primitive<F>(&self, mut visitor: F)
    where
        F: FnMut(&Primitive, &DMat4),
    {
        for (mesh_index, transform) in self.mesh_instances() {
            for primitive in &self.meshes[mesh_index].primitives {
                visitor(primitive, &transform);
            }
        }
    }

    /// Every `(mesh index, accumulated node transform)` pair reachable
    /// from the default scene. A mesh referenced by two nodes appears
    /// twice, once per instance.
    pub(crate) fn mesh_instances(&self) -> Vec<(usize, DMat4)> {
        let mut instances = Vec::new();
        let mut stack: Vec<(usize, DMat4)> = self
            .scene_nodes
            .iter()
            .map(|&n| (n, DMat4::IDENTITY))
            .collect();

        while let Some((node_index, parent_transform)) = stack.pop() {
            let Some(node) = self.nodes.get(node_index) else {
                continue;
            };
            let transform = parent_transform * node.transform;
            if let Some(mesh) = node.mesh {
                if mesh < self.meshes.len() {
                    instances.push((mesh, transform));
                }
            }
            for &child in &node.children {
                stack.push((child, transform));
            }
        }
        instances
    }
}
