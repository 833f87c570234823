/// Vertex layout shared by the uploader, the recorder and the pipeline

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Vertex attribute format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    /// Three 32-bit floats (12 bytes)
    Float32x3,
}

impl VertexFormat {
    pub fn size_bytes(self) -> u32 {
        match self {
            VertexFormat::Float32x3 => 12,
        }
    }
}

/// One attribute of the vertex input layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader input location
    pub location: u32,
    pub format: VertexFormat,
    /// Byte offset inside [`Vertex`]
    pub offset: u32,
}

/// Interleaved vertex: position then color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub color: Vec3,
}

impl Vertex {
    /// Distance between consecutive vertices in a vertex buffer
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

    /// Vertex buffer binding slot
    pub const BINDING: u32 = 0;

    pub const ATTRIBUTES: [VertexAttribute; 2] = [
        VertexAttribute { location: 0, format: VertexFormat::Float32x3, offset: 0 },
        VertexAttribute { location: 1, format: VertexFormat::Float32x3, offset: 12 },
    ];

    pub fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self {
            position: Vec3::from_array(position),
            color: Vec3::from_array(color),
        }
    }
}
