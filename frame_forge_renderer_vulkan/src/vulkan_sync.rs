/// Fence and Semaphore - Vulkan implementations of the synchronization traits

use ash::vk;
use frame_forge::engine_err;
use frame_forge::forge::render::{Fence, PipelineStage, Semaphore};
use frame_forge::forge::{Error, Result};
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

pub(crate) fn pipeline_stage_to_vk(stage: PipelineStage) -> vk::PipelineStageFlags {
    match stage {
        PipelineStage::ColorAttachmentOutput => vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
    }
}

/// Vulkan fence, optionally created signaled
pub struct VulkanFence {
    ctx: Arc<GpuContext>,
    pub(crate) fence: vk::Fence,
}

impl VulkanFence {
    pub(crate) fn new(ctx: Arc<GpuContext>, signaled: bool) -> Result<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::default().flags(flags);

        let fence = unsafe { ctx.device.create_fence(&create_info, None) }
            .map_err(|e| engine_err!("frame_forge::vulkan", "Failed to create fence: {:?}", e))?;

        Ok(Self { ctx, fence })
    }

    pub(crate) fn from_dyn(fence: &dyn Fence) -> Result<&VulkanFence> {
        fence
            .as_any()
            .downcast_ref::<VulkanFence>()
            .ok_or_else(|| Error::InvalidResource("Fence was not created by the Vulkan backend".to_string()))
    }
}

impl Fence for VulkanFence {
    fn wait(&self) -> Result<()> {
        unsafe { self.ctx.device.wait_for_fences(&[self.fence], true, u64::MAX) }
            .map_err(|e| engine_err!("frame_forge::vulkan", "Failed to wait for fence: {:?}", e))
    }

    fn reset(&self) -> Result<()> {
        unsafe { self.ctx.device.reset_fences(&[self.fence]) }
            .map_err(|e| engine_err!("frame_forge::vulkan", "Failed to reset fence: {:?}", e))
    }

    fn is_signaled(&self) -> Result<bool> {
        unsafe { self.ctx.device.get_fence_status(self.fence) }
            .map_err(|e| engine_err!("frame_forge::vulkan", "Failed to query fence status: {:?}", e))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanFence {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_fence(self.fence, None);
        }
    }
}

/// Binary Vulkan semaphore
pub struct VulkanSemaphore {
    ctx: Arc<GpuContext>,
    pub(crate) semaphore: vk::Semaphore,
}

impl VulkanSemaphore {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe { ctx.device.create_semaphore(&create_info, None) }
            .map_err(|e| engine_err!("frame_forge::vulkan", "Failed to create semaphore: {:?}", e))?;

        Ok(Self { ctx, semaphore })
    }

    pub(crate) fn from_dyn(semaphore: &dyn Semaphore) -> Result<&VulkanSemaphore> {
        semaphore
            .as_any()
            .downcast_ref::<VulkanSemaphore>()
            .ok_or_else(|| Error::InvalidResource("Semaphore was not created by the Vulkan backend".to_string()))
    }
}

impl Semaphore for VulkanSemaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanSemaphore {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_semaphore(self.semaphore, None);
        }
    }
}
