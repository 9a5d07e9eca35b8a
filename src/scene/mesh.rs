// scene/mesh.rs
use glam::Mat4;

use super::material::MaterialId;

/// Creation-order identifier of a mesh within one [`Scene`](super::Scene).
///
/// Ids are handed out monotonically and never reused, so ordering by id is a
/// stable, content-independent total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub(crate) u32);

impl MeshId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub(crate) u32);

impl InstanceId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Indexed triangle mesh. Vertex, normal and uv arrays are parallel; counts
/// may disagree, in which case the compiler truncates to the shorter of
/// vertices/normals and zero-fills missing uvs.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub material: Option<MaterialId>,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Number of vertex records this mesh contributes to a batch.
    pub fn effective_vertex_count(&self) -> usize {
        self.vertices.len().min(self.normals.len())
    }
}

/// A placement of an existing mesh under a transform, optionally overriding
/// its material. Instances are split out by the compiler but not drawn by the
/// raster path.
#[derive(Debug, Clone)]
pub struct Instance {
    pub mesh: MeshId,
    pub transform: Mat4,
    pub material: Option<MaterialId>,
}
