/// Framebuffer - Vulkan implementation of the Framebuffer trait
///
/// Wraps a VkFramebuffer over one swapchain image view.
/// Created once at setup, reused every frame that image is acquired.

use ash::vk;
use frame_forge::engine_err;
use frame_forge::forge::render::Framebuffer;
use frame_forge::forge::{Error, Result};
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_render_pass::VulkanRenderPass;
use crate::vulkan_swapchain::VulkanSwapchain;

/// Vulkan framebuffer implementation
pub struct VulkanFramebuffer {
    ctx: Arc<GpuContext>,
    pub(crate) framebuffer: vk::Framebuffer,
    width: u32,
    height: u32,
}

impl VulkanFramebuffer {
    pub(crate) fn from_dyn(framebuffer: &dyn Framebuffer) -> Result<&VulkanFramebuffer> {
        framebuffer
            .as_any()
            .downcast_ref::<VulkanFramebuffer>()
            .ok_or_else(|| Error::InvalidResource("Framebuffer was not created by the Vulkan backend".to_string()))
    }
}

/// One framebuffer per swapchain image, in image order
pub fn create_framebuffers(
    ctx: &Arc<GpuContext>,
    render_pass: &VulkanRenderPass,
    swapchain: &VulkanSwapchain,
) -> Result<Vec<Box<dyn Framebuffer>>> {
    let extent = swapchain.vk_extent();

    swapchain
        .image_views()
        .iter()
        .enumerate()
        .map(|(i, &view)| {
            let attachments = [view];
            let create_info = vk::FramebufferCreateInfo::default()
                .render_pass(render_pass.render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);

            let framebuffer = unsafe { ctx.device.create_framebuffer(&create_info, None) }
                .map_err(|e| engine_err!("frame_forge::vulkan", "Failed to create framebuffer {}: {:?}", i, e))?;

            Ok(Box::new(VulkanFramebuffer {
                ctx: Arc::clone(ctx),
                framebuffer,
                width: extent.width,
                height: extent.height,
            }) as Box<dyn Framebuffer>)
        })
        .collect()
}

impl Framebuffer for VulkanFramebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanFramebuffer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}
