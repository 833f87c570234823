/*!
# Frame Forge - Vulkan Backend

Vulkan implementation of the `frame_forge` graphics device traits.

Uses ash for the Vulkan bindings, ash-window for the window surface and
gpu-allocator for buffer memory. Every backend object shares one
[`GpuContext`], so the device outlives everything created from it.
*/

mod debug;
mod vulkan_context;
mod vulkan_device;
mod vulkan_buffer;
mod vulkan_sync;
mod vulkan_command_buffer;
mod vulkan_swapchain;
mod vulkan_render_pass;
mod vulkan_pipeline;
mod vulkan_frame_buffer;

pub use vulkan_context::GpuContext;
pub use vulkan_device::VulkanGraphicsDevice;
pub use vulkan_swapchain::{Surface, VulkanSwapchain};
pub use vulkan_render_pass::VulkanRenderPass;
pub use vulkan_pipeline::VulkanPipeline;

use frame_forge::engine_info;
use frame_forge::forge::{Config, RendererParts, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

/// Build everything a [`Renderer`](frame_forge::forge::Renderer) needs for `window`
///
/// Creates the device and surface, the swapchain, the render pass in the
/// swapchain format, the pipeline sized to the swapchain extent, and one
/// framebuffer per swapchain image.
///
/// # Example
///
/// ```no_run
/// use frame_forge::forge::{Config, Renderer};
/// # fn run(window: &winit::window::Window) -> frame_forge::forge::Result<()> {
/// let config = Config::default();
/// let parts = frame_forge_renderer_vulkan::create_renderer_parts(window, &config)?;
/// let mut renderer = Renderer::new(parts, &[], &config)?;
/// renderer.draw()?;
/// renderer.clean_up()
/// # }
/// ```
pub fn create_renderer_parts<W: HasDisplayHandle + HasWindowHandle>(
    window: &W,
    config: &Config,
) -> Result<RendererParts> {
    let (device, surface) = VulkanGraphicsDevice::new(window, config)?;
    let ctx = Arc::clone(device.context());

    let swapchain = VulkanSwapchain::new(
        Arc::clone(&ctx),
        surface,
        (config.window_width, config.window_height),
    )?;
    let render_pass = VulkanRenderPass::new(Arc::clone(&ctx), swapchain.format())?;
    let pipeline = VulkanPipeline::new(
        Arc::clone(&ctx),
        &render_pass,
        swapchain.vk_extent(),
        &config.vertex_shader_path,
        &config.fragment_shader_path,
    )?;
    let framebuffers = vulkan_frame_buffer::create_framebuffers(&ctx, &render_pass, &swapchain)?;

    engine_info!(
        "frame_forge::vulkan",
        "Vulkan backend ready ({} framebuffers)",
        framebuffers.len()
    );

    Ok(RendererParts {
        device: Arc::new(device),
        swapchain: Box::new(swapchain),
        render_pass: Box::new(render_pass),
        pipeline: Box::new(pipeline),
        framebuffers,
    })
}

#[cfg(test)]
#[path = "vulkan_conversion_tests.rs"]
mod tests;
