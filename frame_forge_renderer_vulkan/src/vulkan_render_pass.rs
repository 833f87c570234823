/// RenderPass - Vulkan implementation of the RenderPass trait
///
/// One color attachment in the swapchain format: cleared on load, stored,
/// and handed to presentation at the end of the pass.

use ash::vk;
use frame_forge::engine_err;
use frame_forge::forge::render::RenderPass;
use frame_forge::forge::{Error, Result};
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Layout transitions around the single subpass
///
/// The first dependency keeps the layout transition from running before the
/// swapchain image is released by presentation; the second makes the color
/// writes finish before the image goes back to the presentation engine.
pub(crate) fn subpass_dependencies() -> [vk::SubpassDependency; 2] {
    [
        vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::BOTTOM_OF_PIPE)
            .src_access_mask(vk::AccessFlags::MEMORY_READ)
            .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE),
        vk::SubpassDependency::default()
            .src_subpass(0)
            .dst_subpass(vk::SUBPASS_EXTERNAL)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
            .dst_stage_mask(vk::PipelineStageFlags::BOTTOM_OF_PIPE)
            .dst_access_mask(vk::AccessFlags::MEMORY_READ),
    ]
}

/// Vulkan render pass implementation
pub struct VulkanRenderPass {
    ctx: Arc<GpuContext>,
    pub(crate) render_pass: vk::RenderPass,
}

impl VulkanRenderPass {
    pub fn new(ctx: Arc<GpuContext>, color_format: vk::Format) -> Result<Self> {
        let color_attachment = vk::AttachmentDescription::default()
            .format(color_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR);

        let color_attachment_ref = vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

        let color_attachments = [color_attachment_ref];
        let subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_attachments);

        let attachments = [color_attachment];
        let subpasses = [subpass];
        let dependencies = subpass_dependencies();
        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = unsafe { ctx.device.create_render_pass(&create_info, None) }
            .map_err(|e| engine_err!("frame_forge::vulkan", "Failed to create render pass: {:?}", e))?;

        Ok(Self { ctx, render_pass })
    }

    pub(crate) fn from_dyn(render_pass: &dyn RenderPass) -> Result<&VulkanRenderPass> {
        render_pass
            .as_any()
            .downcast_ref::<VulkanRenderPass>()
            .ok_or_else(|| Error::InvalidResource("Render pass was not created by the Vulkan backend".to_string()))
    }
}

impl RenderPass for VulkanRenderPass {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanRenderPass {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
