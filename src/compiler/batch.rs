// compiler/batch.rs
//
// Three-pass batch construction: size every material group exactly, allocate
// fixed-capacity staging for each group, then re-walk the meshes in the same
// order writing rebased geometry at the group's cursor. Buffer regions per
// material must be contiguous and exactly sized before any write, which is
// why sizing is a separate pass.
use std::collections::BTreeMap;

use crate::compiler::collector::Collector;
use crate::error::{Error, Result};
use crate::renderer::Vertex;
use crate::scene::{MaterialId, Mesh, MeshId, Scene};

/// CPU-side staging for one material group, with capacities fixed by the
/// sizing pass. `written <= capacity` holds at every point; the staging is
/// never grown past its allocation.
pub struct BatchStaging {
    pub material: Option<MaterialId>,
    /// Index into the flattened material array, -1 for the no-material group.
    pub material_idx: i32,
    pub vertex_capacity: usize,
    pub index_capacity: usize,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl BatchStaging {
    fn with_capacity(
        material: Option<MaterialId>,
        material_idx: i32,
        vertex_capacity: usize,
        index_capacity: usize,
    ) -> Self {
        Self {
            material,
            material_idx,
            vertex_capacity,
            index_capacity,
            vertices: Vec::with_capacity(vertex_capacity),
            indices: Vec::with_capacity(index_capacity),
        }
    }

    pub fn vertices_written(&self) -> usize {
        self.vertices.len()
    }

    pub fn indices_written(&self) -> usize {
        self.indices.len()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Copy one mesh's geometry at the current cursor. Vertex records are
    /// truncated to `min(vertices, normals)`; missing uvs read as zero.
    /// Indices are rebased by the pre-write vertex cursor so the shared
    /// buffer stays addressable by one draw per batch.
    fn write_mesh(&mut self, mesh: &Mesh) -> Result<()> {
        let start_vertex = self.vertices.len() as u32;
        let num_vertices = mesh.effective_vertex_count();

        if self.vertices.len() + num_vertices > self.vertex_capacity
            || self.indices.len() + mesh.indices.len() > self.index_capacity
        {
            return Err(Error::ResourceAllocation(format!(
                "batch capacity overrun writing mesh '{}'",
                mesh.name
            )));
        }

        for i in 0..num_vertices {
            self.vertices.push(Vertex {
                position: mesh.vertices[i],
                normal: mesh.normals[i],
                uv: mesh.uvs.get(i).copied().unwrap_or([0.0, 0.0]),
            });
        }

        for &index in &mesh.indices {
            self.indices.push(index + start_vertex);
        }

        Ok(())
    }
}

/// Size and populate per-material staging for the directly-rendered meshes.
/// Meshes are visited in the (creation-id ordered) `meshes` slice order for
/// both passes, so cursor layout is deterministic.
pub fn stage_batches(
    scene: &Scene,
    meshes: &[MeshId],
    materials: &Collector<MaterialId>,
) -> Result<Vec<BatchStaging>> {
    // Pass 1: sizing
    let mut sizes: BTreeMap<Option<MaterialId>, (usize, usize)> = BTreeMap::new();
    for &id in meshes {
        let mesh = scene.mesh(id);
        let entry = sizes.entry(mesh.material).or_insert((0, 0));
        entry.0 += mesh.effective_vertex_count();
        entry.1 += mesh.indices.len();
    }

    // Pass 2: allocation
    let mut batches: BTreeMap<Option<MaterialId>, BatchStaging> = BTreeMap::new();
    for (&material, &(num_vertices, num_indices)) in &sizes {
        let material_idx = match material {
            Some(id) => materials.lookup(id)? as i32,
            None => -1,
        };
        batches.insert(
            material,
            BatchStaging::with_capacity(material, material_idx, num_vertices, num_indices),
        );
    }

    // Pass 3: population, identical iteration order
    for &id in meshes {
        let mesh = scene.mesh(id);
        let batch = batches
            .get_mut(&mesh.material)
            .expect("sizing pass covered every material group");
        batch.write_mesh(mesh)?;
    }

    Ok(batches.into_values().collect())
}

/// GPU-resident geometry for one material group, drawn with a single indexed
/// draw call. Buffer capacities are fixed at creation.
#[derive(Debug)]
pub struct BatchData {
    pub material_idx: i32,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub vertex_capacity: u32,
    pub index_capacity: u32,
    pub vertices_written: u32,
    pub indices_written: u32,
}

/// Upload staged batches into exactly-sized, write-once GPU buffers.
pub fn upload_batches(device: &wgpu::Device, staged: &[BatchStaging]) -> Result<Vec<BatchData>> {
    let max_size = device.limits().max_buffer_size;
    let mut batches = Vec::with_capacity(staged.len());
    let mut bytes_uploaded = 0u64;

    for staging in staged {
        if staging.vertices_written() == 0 || staging.indices_written() == 0 {
            log::debug!(
                "skipping empty batch for material {}",
                staging.material_idx
            );
            continue;
        }

        let vertex_bytes = bytemuck::cast_slice::<Vertex, u8>(staging.vertices());
        let index_bytes = bytemuck::cast_slice::<u32, u8>(staging.indices());

        if vertex_bytes.len() as u64 > max_size || index_bytes.len() as u64 > max_size {
            return Err(Error::ResourceAllocation(format!(
                "batch for material {} exceeds device buffer limit ({} bytes)",
                staging.material_idx, max_size
            )));
        }

        let vertex_buffer = create_filled_buffer(
            device,
            "BatchVertexBuffer",
            vertex_bytes,
            wgpu::BufferUsages::VERTEX,
        );
        let index_buffer = create_filled_buffer(
            device,
            "BatchIndexBuffer",
            index_bytes,
            wgpu::BufferUsages::INDEX,
        );

        bytes_uploaded += (vertex_bytes.len() + index_bytes.len()) as u64;

        batches.push(BatchData {
            material_idx: staging.material_idx,
            vertex_buffer,
            index_buffer,
            vertex_capacity: staging.vertex_capacity as u32,
            index_capacity: staging.index_capacity as u32,
            vertices_written: staging.vertices_written() as u32,
            indices_written: staging.indices_written() as u32,
        });
    }

    log::info!(
        "uploaded {} batches ({:.2} MiB)",
        batches.len(),
        bytes_uploaded as f64 / (1024.0 * 1024.0)
    );

    Ok(batches)
}

fn create_filled_buffer(
    device: &wgpu::Device,
    label: &str,
    contents: &[u8],
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: contents.len() as u64,
        usage,
        mapped_at_creation: true,
    });
    buffer
        .slice(..)
        .get_mapped_range_mut()
        .copy_from_slice(contents);
    buffer.unmap();
    buffer
}
