/*!
# Frame Forge

Frame synchronization and resource upload for a Vulkan-style graphics device.

The crate is backend-agnostic: it drives a [`GraphicsDevice`](forge::render::GraphicsDevice)
trait object and the swapchain, render pass, pipeline and framebuffers a
backend hands over in [`RendererParts`](forge::RendererParts). The Vulkan
implementation lives in `frame_forge_renderer_vulkan`.

## Architecture

- **Uploader**: moves vertex and index bytes into device-local buffers through a staging buffer
- **FrameCycle**: fixed ring of frame slots (fence + two semaphores each)
- **Frame driver**: one wait, acquire, submit, present cycle per frame
- **Command recorder**: one pre-recorded command buffer per swapchain image
- **Renderer**: init, draw and teardown in the right order
*/

// Internal modules
mod error;
mod engine;
pub mod log;
mod config;
pub mod graphics_device;
mod vertex;
mod uploader;
mod mesh;
mod frame_cycle;
mod frame_driver;
mod command_recorder;
mod renderer;

// Main forge namespace module
pub mod forge {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    pub use crate::config::Config;

    // Geometry
    pub use crate::vertex::{Vertex, VertexAttribute, VertexFormat};
    pub use crate::mesh::{GeometryDesc, Mesh};
    pub use crate::uploader::{read_back, upload, UploadUsage};

    // Frame engine
    pub use crate::frame_cycle::{
        target_for, FrameCycle, FrameSlot, FrameSlotIndex, SwapchainTarget, MAX_FRAMES_IN_FLIGHT,
    };
    pub use crate::frame_driver::{draw_frame, FrameReport};
    pub use crate::command_recorder::record_draw_commands;
    pub use crate::renderer::{Renderer, RendererParts};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
    }

    // Backend traits
    pub mod render {
        pub use crate::graphics_device::*;
    }
}

// Re-export math library at crate root
pub use glam;
