/// Graphics device module - backend traits consumed by the frame engine

pub mod graphics_device;
pub mod buffer;
pub mod sync;
pub mod command_buffer;
pub mod swapchain;
pub mod pipeline;
pub mod frame_buffer;

pub use graphics_device::*;
pub use buffer::*;
pub use sync::*;
pub use command_buffer::*;
pub use swapchain::*;
pub use pipeline::*;
pub use frame_buffer::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
