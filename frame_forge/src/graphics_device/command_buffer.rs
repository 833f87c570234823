/// Command buffer trait for pre-recorded draw work

use std::any::Any;

use crate::error::Result;
use crate::graphics_device::{Buffer, Framebuffer, Pipeline, RenderPass};

/// Recording mode of a command buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBufferUsage {
    /// Submitted once then discarded (transfers)
    OneTimeSubmit,
    /// May be resubmitted, and pending on the queue more than once
    SimultaneousUse,
}

/// Index element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    pub fn size_bytes(self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// A primary command buffer
///
/// Methods map one-to-one onto recorded commands. The render area of a
/// render pass is the full extent of the framebuffer it is begun on.
pub trait CommandBuffer: Send + Sync {
    fn begin(&mut self, usage: CommandBufferUsage) -> Result<()>;

    fn begin_render_pass(
        &mut self,
        render_pass: &dyn RenderPass,
        framebuffer: &dyn Framebuffer,
        clear_color: [f32; 4],
    ) -> Result<()>;

    fn bind_pipeline(&mut self, pipeline: &dyn Pipeline) -> Result<()>;

    fn bind_vertex_buffer(&mut self, buffer: &dyn Buffer, binding: u32, offset: u64) -> Result<()>;

    fn bind_index_buffer(&mut self, buffer: &dyn Buffer, offset: u64, index_type: IndexType) -> Result<()>;

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()>;

    fn end_render_pass(&mut self) -> Result<()>;

    fn end(&mut self) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}
