/// Synchronization primitives: fences (GPU to CPU) and semaphores (GPU to GPU)

use std::any::Any;

use crate::error::Result;

/// GPU to CPU completion signal
pub trait Fence: Send + Sync {
    /// Block until the fence is signaled (no timeout)
    fn wait(&self) -> Result<()>;

    /// Return the fence to the unsignaled state
    fn reset(&self) -> Result<()>;

    /// Query the fence without blocking
    fn is_signaled(&self) -> Result<bool>;

    fn as_any(&self) -> &dyn Any;
}

/// Binary GPU to GPU ordering signal, invisible to the CPU
pub trait Semaphore: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// Pipeline stage at which a submission waits on its semaphore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    ColorAttachmentOutput,
}
