/// GraphicsDevice trait - factory and queue access for a backend

use crate::error::Result;
use crate::graphics_device::{
    Buffer, BufferCopy, BufferDesc, CommandBuffer, Fence, PipelineStage, Semaphore,
};

/// One graphics-queue submission of a pre-recorded command buffer
pub struct Submission<'a> {
    pub command_buffer: &'a dyn CommandBuffer,
    /// Semaphore the GPU waits on before `wait_stage`
    pub wait_semaphore: &'a dyn Semaphore,
    pub wait_stage: PipelineStage,
    /// Semaphore signaled when the command buffer completes
    pub signal_semaphore: &'a dyn Semaphore,
    /// Fence signaled when the command buffer completes; must be unsignaled
    pub fence: &'a dyn Fence,
}

/// Logical device plus the queues the frame engine submits to
///
/// Objects it creates keep the device alive; it is destroyed once the last
/// of them is dropped.
pub trait GraphicsDevice: Send + Sync {
    /// Create a buffer with bound memory
    fn create_buffer(&self, desc: BufferDesc) -> Result<Box<dyn Buffer>>;

    /// Record, submit and complete a one-shot copy from `src` to `dst`
    ///
    /// Blocks until the transfer queue is idle, so both buffers may be
    /// dropped as soon as this returns. The transient command buffer is
    /// released on every path.
    fn copy_buffer_blocking(&self, src: &dyn Buffer, dst: &dyn Buffer, region: BufferCopy) -> Result<()>;

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>>;

    fn create_semaphore(&self) -> Result<Box<dyn Semaphore>>;

    /// Allocate primary command buffers from the graphics command pool
    fn allocate_command_buffers(&self, count: usize) -> Result<Vec<Box<dyn CommandBuffer>>>;

    /// Submit to the graphics queue
    fn submit(&self, submission: &Submission<'_>) -> Result<()>;

    /// Block until every queue of the device is idle
    fn wait_idle(&self) -> Result<()>;
}
