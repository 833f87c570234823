/// GpuContext - Vulkan instance, device and pools shared by every backend object
///
/// Every buffer, fence, semaphore, command buffer, swapchain, render pass,
/// pipeline and framebuffer holds an `Arc<GpuContext>`. The context is
/// destroyed with the last of them, so no Vulkan object outlives its device.

use ash::vk;
use frame_forge::forge::{Error, Result};
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};

/// Validation layer loader and messenger
pub(crate) struct DebugMessenger {
    pub(crate) loader: ash::ext::debug_utils::Instance,
    pub(crate) messenger: vk::DebugUtilsMessengerEXT,
}

/// Shared GPU context for all Vulkan resources
pub struct GpuContext {
    /// Kept alive for the lifetime of the instance (owns the loaded library)
    pub(crate) _entry: ash::Entry,

    pub(crate) instance: ash::Instance,

    pub(crate) physical_device: vk::PhysicalDevice,

    /// Vulkan logical device
    pub(crate) device: ash::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop to ensure it's dropped BEFORE the device is destroyed
    pub(crate) allocator: ManuallyDrop<Mutex<Allocator>>,

    pub(crate) graphics_queue: vk::Queue,
    pub(crate) graphics_queue_family: u32,

    /// Present queue (may be the same as graphics)
    pub(crate) present_queue: vk::Queue,
    pub(crate) present_queue_family: u32,

    /// Pool of the pre-recorded per-image command buffers
    pub(crate) command_pool: Mutex<vk::CommandPool>,

    /// Pool for one-shot transfer command buffers
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    pub(crate) upload_command_pool: Mutex<vk::CommandPool>,

    pub(crate) debug: Option<DebugMessenger>,
}

impl GpuContext {
    pub(crate) fn allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| Error::BackendError("GPU allocator lock poisoned".to_string()))
    }

    pub(crate) fn command_pool(&self) -> Result<MutexGuard<'_, vk::CommandPool>> {
        self.command_pool
            .lock()
            .map_err(|_| Error::BackendError("Command pool lock poisoned".to_string()))
    }

    pub(crate) fn upload_command_pool(&self) -> Result<MutexGuard<'_, vk::CommandPool>> {
        self.upload_command_pool
            .lock()
            .map_err(|_| Error::BackendError("Upload command pool lock poisoned".to_string()))
    }

    /// Queue families the swapchain images are shared between
    pub(crate) fn queue_families(&self) -> (u32, u32) {
        (self.graphics_queue_family, self.present_queue_family)
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            // Wait for device to finish
            self.device.device_wait_idle().ok();

            // 1. Command pools (frees any command buffer still allocated from them)
            for pool in [&mut self.command_pool, &mut self.upload_command_pool] {
                if let Ok(pool) = pool.get_mut() {
                    if *pool != vk::CommandPool::null() {
                        self.device.destroy_command_pool(*pool, None);
                        *pool = vk::CommandPool::null();
                    }
                }
            }

            // 2. Drop allocator: free VkDeviceMemory pages BEFORE destroying device
            ManuallyDrop::drop(&mut self.allocator);

            // 3. Destroy debug messenger BEFORE device and instance
            if let Some(debug) = self.debug.take() {
                debug.loader.destroy_debug_utils_messenger(debug.messenger, None);
            }

            // 4. Destroy device and instance
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
