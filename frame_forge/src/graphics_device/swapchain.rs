/// Swapchain trait and the image index type

use std::fmt;

use crate::error::Result;
use crate::graphics_device::Semaphore;

/// Index of a presentable swapchain image, as returned by acquisition
///
/// Addresses image-bound resources (framebuffer, pre-recorded command buffer).
/// Never interchangeable with a frame slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageIndex(u32);

impl ImageIndex {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ImageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image {}", self.0)
    }
}

/// Result of a successful presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Optimal,
    /// Presented, but the swapchain no longer matches the surface exactly
    Suboptimal,
}

/// Presentable image chain negotiated with the compositor
pub trait Swapchain: Send + Sync {
    /// Number of images, fixed at creation
    fn image_count(&self) -> usize;

    /// Image size in pixels
    fn extent(&self) -> (u32, u32);

    /// Acquire the next image; `signal` fires once the image is ready for rendering
    ///
    /// Fails with `Error::SwapchainOutOfDate` when the surface changed.
    fn acquire_next_image(&mut self, signal: &dyn Semaphore) -> Result<ImageIndex>;

    /// Queue `image` for presentation once `wait` is signaled
    ///
    /// Fails with `Error::SwapchainOutOfDate` when the surface changed.
    fn present(&mut self, image: ImageIndex, wait: &dyn Semaphore) -> Result<PresentOutcome>;
}
