/// Buffer - Vulkan implementation of the Buffer trait

use ash::vk;
use frame_forge::{engine_err, engine_error};
use frame_forge::forge::render::{Buffer, BufferUsage, MemoryLocation};
use frame_forge::forge::{Error, Result};
use gpu_allocator::vulkan::Allocation;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan usage flags of an engine buffer usage
pub(crate) fn buffer_usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    if usage.contains(BufferUsage::TRANSFER_SRC) {
        flags |= vk::BufferUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(BufferUsage::TRANSFER_DST) {
        flags |= vk::BufferUsageFlags::TRANSFER_DST;
    }
    if usage.contains(BufferUsage::VERTEX) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUsage::INDEX) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    flags
}

/// gpu-allocator location of an engine memory location
pub(crate) fn memory_location_to_gpu(location: MemoryLocation) -> gpu_allocator::MemoryLocation {
    match location {
        MemoryLocation::HostVisible => gpu_allocator::MemoryLocation::CpuToGpu,
        MemoryLocation::DeviceLocal => gpu_allocator::MemoryLocation::GpuOnly,
        MemoryLocation::Readback => gpu_allocator::MemoryLocation::GpuToCpu,
    }
}

/// Vulkan buffer implementation
pub struct VulkanBuffer {
    /// Shared GPU context (device, allocator, queue, command pool)
    ctx: Arc<GpuContext>,
    pub(crate) buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: u64,
    usage: BufferUsage,
    location: MemoryLocation,
}

impl VulkanBuffer {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        buffer: vk::Buffer,
        allocation: Allocation,
        size: u64,
        usage: BufferUsage,
        location: MemoryLocation,
    ) -> Self {
        Self {
            ctx,
            buffer,
            allocation: Some(allocation),
            size,
            usage,
            location,
        }
    }

    /// Downcast an engine buffer created by this backend
    pub(crate) fn from_dyn(buffer: &dyn Buffer) -> Result<&VulkanBuffer> {
        buffer
            .as_any()
            .downcast_ref::<VulkanBuffer>()
            .ok_or_else(|| Error::InvalidResource("Buffer was not created by the Vulkan backend".to_string()))
    }

    /// Bind the allocation's memory to the buffer
    pub(crate) fn bind_memory(&self) -> Result<()> {
        let allocation = self
            .allocation
            .as_ref()
            .ok_or_else(|| Error::BackendError("Buffer has no allocation".to_string()))?;

        unsafe {
            self.ctx
                .device
                .bind_buffer_memory(self.buffer, allocation.memory(), allocation.offset())
                .map_err(|e| engine_err!("frame_forge::vulkan", "Failed to bind buffer memory: {:?}", e))
        }
    }

    fn check_range(&self, offset: u64, len: u64) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(Error::InvalidResource(format!(
                "Range {}..{} exceeds buffer size {}",
                offset,
                offset.saturating_add(len),
                self.size
            ))),
        }
    }

    fn mapped_slice(&self) -> Result<&[u8]> {
        let allocation = self.allocation.as_ref().ok_or_else(|| {
            engine_error!("frame_forge::vulkan", "Buffer access failed: no GPU allocation");
            Error::BackendError("Buffer has no allocation".to_string())
        })?;
        allocation
            .mapped_slice()
            .ok_or_else(|| Error::BackendError("Buffer is not CPU-accessible".to_string()))
    }
}

impl Buffer for VulkanBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn location(&self) -> MemoryLocation {
        self.location
    }

    fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        self.check_range(offset, data.len() as u64)?;
        let allocation = self.allocation.as_ref().ok_or_else(|| {
            engine_error!("frame_forge::vulkan", "Buffer write failed: no GPU allocation");
            Error::BackendError("Buffer has no allocation".to_string())
        })?;

        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| Error::BackendError("Buffer is not CPU-accessible".to_string()))?
            .as_ptr() as *mut u8;

        // Host-visible memory from gpu-allocator is coherent; no flush needed
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped_ptr.add(offset as usize), data.len());
        }
        Ok(())
    }

    fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        self.check_range(offset, len)?;
        let mapped = self.mapped_slice()?;
        Ok(mapped[offset as usize..(offset + len) as usize].to_vec())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        unsafe {
            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if lock fails - we still need to destroy the buffer
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
