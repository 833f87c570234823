/// Geometry objects: device-local vertex and index buffers

use crate::error::Result;
use crate::graphics_device::{Buffer, GraphicsDevice, IndexType};
use crate::uploader::{upload, UploadUsage};
use crate::vertex::Vertex;
use crate::{engine_bail_warn, engine_debug};

/// CPU-side geometry consumed when the renderer is built
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeometryDesc {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl GeometryDesc {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }
}

/// Immutable geometry living in device-local memory
///
/// Owns its two buffers; they are destroyed when the mesh is dropped, which
/// must only happen once no submitted command buffer references them.
pub struct Mesh {
    vertex_buffer: Box<dyn Buffer>,
    index_buffer: Box<dyn Buffer>,
    vertex_count: u32,
    index_count: u32,
}

impl Mesh {
    /// Index element type of every mesh
    pub const INDEX_TYPE: IndexType = IndexType::U32;

    /// Upload `vertices` and `indices` to the device
    ///
    /// # Errors
    ///
    /// - `InvalidResource` if either list is empty or an index is out of range
    /// - any upload failure; nothing is left allocated in that case
    pub fn new(device: &dyn GraphicsDevice, vertices: &[Vertex], indices: &[u32]) -> Result<Self> {
        if vertices.is_empty() || indices.is_empty() {
            engine_bail_warn!(
                "frame_forge::mesh",
                "Mesh needs vertices and indices (got {} vertices, {} indices)",
                vertices.len(),
                indices.len()
            );
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            engine_bail_warn!(
                "frame_forge::mesh",
                "Index {} out of range for {} vertices",
                bad,
                vertices.len()
            );
        }

        let vertex_buffer = upload(device, bytemuck::cast_slice(vertices), UploadUsage::VertexData)?;
        let index_buffer = upload(device, bytemuck::cast_slice(indices), UploadUsage::IndexData)?;

        engine_debug!(
            "frame_forge::mesh",
            "Mesh created: {} vertices, {} indices",
            vertices.len(),
            indices.len()
        );

        Ok(Self {
            vertex_buffer,
            index_buffer,
            vertex_count: vertices.len() as u32,
            index_count: indices.len() as u32,
        })
    }

    pub fn from_desc(device: &dyn GraphicsDevice, desc: &GeometryDesc) -> Result<Self> {
        Self::new(device, &desc.vertices, &desc.indices)
    }

    pub fn vertex_buffer(&self) -> &dyn Buffer {
        self.vertex_buffer.as_ref()
    }

    pub fn index_buffer(&self) -> &dyn Buffer {
        self.index_buffer.as_ref()
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
