/// CommandBuffer - Vulkan implementation of the CommandBuffer trait
///
/// Per-image command buffers are allocated from the context's command pool,
/// recorded once and resubmitted every frame that image is acquired.

use ash::vk;
use frame_forge::engine_err;
use frame_forge::forge::render::{
    Buffer, CommandBuffer, CommandBufferUsage, Framebuffer, IndexType, Pipeline, RenderPass,
};
use frame_forge::forge::{Error, Result};
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_frame_buffer::VulkanFramebuffer;
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_render_pass::VulkanRenderPass;

pub(crate) fn command_buffer_usage_to_vk(usage: CommandBufferUsage) -> vk::CommandBufferUsageFlags {
    match usage {
        CommandBufferUsage::OneTimeSubmit => vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
        CommandBufferUsage::SimultaneousUse => vk::CommandBufferUsageFlags::SIMULTANEOUS_USE,
    }
}

pub(crate) fn index_type_to_vk(index_type: IndexType) -> vk::IndexType {
    match index_type {
        IndexType::U16 => vk::IndexType::UINT16,
        IndexType::U32 => vk::IndexType::UINT32,
    }
}

/// Vulkan primary command buffer
pub struct VulkanCommandBuffer {
    ctx: Arc<GpuContext>,
    pub(crate) command_buffer: vk::CommandBuffer,
    /// Whether the command buffer is currently recording
    is_recording: bool,
    /// Whether we're inside a render pass
    in_render_pass: bool,
}

impl VulkanCommandBuffer {
    /// Allocate `count` primary command buffers from the context's command pool
    pub(crate) fn allocate(ctx: &Arc<GpuContext>, count: usize) -> Result<Vec<Self>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let pool = ctx.command_pool()?;
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count as u32);

        let command_buffers = unsafe { ctx.device.allocate_command_buffers(&allocate_info) }
            .map_err(|e| engine_err!("frame_forge::vulkan", "Failed to allocate {} command buffers: {:?}", count, e))?;

        Ok(command_buffers
            .into_iter()
            .map(|command_buffer| Self {
                ctx: Arc::clone(ctx),
                command_buffer,
                is_recording: false,
                in_render_pass: false,
            })
            .collect())
    }

    pub(crate) fn from_dyn(command_buffer: &dyn CommandBuffer) -> Result<&VulkanCommandBuffer> {
        command_buffer
            .as_any()
            .downcast_ref::<VulkanCommandBuffer>()
            .ok_or_else(|| Error::InvalidResource("Command buffer was not created by the Vulkan backend".to_string()))
    }

    fn check_recording(&self) -> Result<()> {
        if !self.is_recording {
            return Err(Error::BackendError("Command buffer not recording".to_string()));
        }
        Ok(())
    }

    fn check_in_render_pass(&self) -> Result<()> {
        self.check_recording()?;
        if !self.in_render_pass {
            return Err(Error::BackendError("Not inside a render pass".to_string()));
        }
        Ok(())
    }
}

impl CommandBuffer for VulkanCommandBuffer {
    fn begin(&mut self, usage: CommandBufferUsage) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!("frame_forge::vulkan", "Failed to reset command buffer: {:?}", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default().flags(command_buffer_usage_to_vk(usage));
            self.ctx
                .device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| engine_err!("frame_forge::vulkan", "Failed to begin command buffer: {:?}", e))?;
        }

        self.is_recording = true;
        self.in_render_pass = false;
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &dyn RenderPass,
        framebuffer: &dyn Framebuffer,
        clear_color: [f32; 4],
    ) -> Result<()> {
        self.check_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Already inside a render pass".to_string()));
        }

        let vk_render_pass = VulkanRenderPass::from_dyn(render_pass)?;
        let vk_framebuffer = VulkanFramebuffer::from_dyn(framebuffer)?;

        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue { float32: clear_color },
        }];

        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(vk_render_pass.render_pass)
            .framebuffer(vk_framebuffer.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D {
                    width: framebuffer.width(),
                    height: framebuffer.height(),
                },
            })
            .clear_values(&clear_values);

        unsafe {
            self.ctx.device.cmd_begin_render_pass(
                self.command_buffer,
                &render_pass_info,
                vk::SubpassContents::INLINE,
            );
        }

        self.in_render_pass = true;
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &dyn Pipeline) -> Result<()> {
        self.check_in_render_pass()?;
        let vk_pipeline = VulkanPipeline::from_dyn(pipeline)?;

        unsafe {
            self.ctx.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_pipeline.pipeline,
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &dyn Buffer, binding: u32, offset: u64) -> Result<()> {
        self.check_recording()?;
        let vk_buffer = VulkanBuffer::from_dyn(buffer)?;

        unsafe {
            self.ctx
                .device
                .cmd_bind_vertex_buffers(self.command_buffer, binding, &[vk_buffer.buffer], &[offset]);
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &dyn Buffer, offset: u64, index_type: IndexType) -> Result<()> {
        self.check_recording()?;
        let vk_buffer = VulkanBuffer::from_dyn(buffer)?;

        unsafe {
            self.ctx.device.cmd_bind_index_buffer(
                self.command_buffer,
                vk_buffer.buffer,
                offset,
                index_type_to_vk(index_type),
            );
        }
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()> {
        self.check_in_render_pass()?;

        unsafe {
            self.ctx.device.cmd_draw_indexed(
                self.command_buffer,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.check_in_render_pass()?;

        unsafe {
            self.ctx.device.cmd_end_render_pass(self.command_buffer);
        }
        self.in_render_pass = false;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.check_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Render pass not ended before ending command buffer".to_string()));
        }

        unsafe { self.ctx.device.end_command_buffer(self.command_buffer) }
            .map_err(|e| engine_err!("frame_forge::vulkan", "Failed to end command buffer: {:?}", e))?;

        self.is_recording = false;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanCommandBuffer {
    fn drop(&mut self) {
        if let Ok(pool) = self.ctx.command_pool.lock() {
            unsafe {
                self.ctx.device.free_command_buffers(*pool, &[self.command_buffer]);
            }
        }
    }
}
