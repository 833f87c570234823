/// Framebuffer trait

use std::any::Any;

/// Framebuffer wrapping the view of one swapchain image
pub trait Framebuffer: Send + Sync {
    /// Width in pixels
    fn width(&self) -> u32;

    /// Height in pixels
    fn height(&self) -> u32;

    fn as_any(&self) -> &dyn Any;
}
