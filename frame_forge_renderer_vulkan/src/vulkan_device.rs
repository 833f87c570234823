/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Owns the setup of the instance, the validation messenger, the logical
/// device, the queues, the allocator and the command pools, all stored in
/// the shared [`GpuContext`].

use ash::vk;
use frame_forge::forge::render::{
    Buffer, BufferCopy, BufferDesc, CommandBuffer, Fence, GraphicsDevice, MemoryLocation, Semaphore,
    Submission,
};
use frame_forge::forge::{Config, Error, Result};
use frame_forge::{engine_bail_warn, engine_debug, engine_err, engine_error, engine_info, engine_warn};
use gpu_allocator::vulkan::{AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::{CStr, CString};
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

use crate::debug::{messenger_severities, vulkan_debug_callback};
use crate::vulkan_buffer::{buffer_usage_to_vk, memory_location_to_gpu, VulkanBuffer};
use crate::vulkan_command_buffer::VulkanCommandBuffer;
use crate::vulkan_context::{DebugMessenger, GpuContext};
use crate::vulkan_swapchain::Surface;
use crate::vulkan_sync::{pipeline_stage_to_vk, VulkanFence, VulkanSemaphore};

/// Graphics and present queue families of a physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

/// Queue family selection
///
/// The graphics family is the first one supporting graphics; the present
/// family is the graphics family when it can present, otherwise the first
/// family that can.
pub(crate) fn select_queue_families(
    families: &[vk::QueueFamilyProperties],
    supports_present: impl Fn(u32) -> bool,
) -> Option<QueueFamilies> {
    let graphics = families
        .iter()
        .position(|family| family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS))?
        as u32;

    let present = if supports_present(graphics) {
        graphics
    } else {
        (0..families.len() as u32).find(|&i| supports_present(i))?
    };

    Some(QueueFamilies { graphics, present })
}

pub(crate) const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Device extensions every selected GPU must expose
pub(crate) const DEVICE_EXTENSIONS: [&CStr; 1] = [ash::khr::swapchain::NAME];

/// Names in `required` that `available` lacks
pub(crate) fn missing_names(available: &[&CStr], required: &[&CStr]) -> Vec<String> {
    required
        .iter()
        .filter(|name| !available.contains(*name))
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}

/// Fail with a readable cause when an instance layer or extension is missing
pub(crate) fn require_names(kind: &str, available: &[&CStr], required: &[&CStr]) -> Result<()> {
    let missing = missing_names(available, required);
    if missing.is_empty() {
        return Ok(());
    }
    engine_error!("frame_forge::vulkan", "Missing Vulkan {}: {}", kind, missing.join(", "));
    Err(Error::InitializationFailed(format!("Missing Vulkan {}: {}", kind, missing.join(", "))))
}

/// Why a physical device cannot drive a swapchain on the surface, if it cannot
pub(crate) fn device_unsuitable_reason(
    device_extensions: &[&CStr],
    surface_format_count: usize,
    present_mode_count: usize,
) -> Option<String> {
    let missing = missing_names(device_extensions, &DEVICE_EXTENSIONS);
    if !missing.is_empty() {
        Some(format!("missing device extensions: {}", missing.join(", ")))
    } else if surface_format_count == 0 {
        Some("no surface formats".to_string())
    } else if present_mode_count == 0 {
        Some("no present modes".to_string())
    } else {
        None
    }
}

fn extension_names(properties: &[vk::ExtensionProperties]) -> Vec<&CStr> {
    properties.iter().filter_map(|p| p.extension_name_as_c_str().ok()).collect()
}

fn layer_names(properties: &[vk::LayerProperties]) -> Vec<&CStr> {
    properties.iter().filter_map(|p| p.layer_name_as_c_str().ok()).collect()
}

/// Unique queue families to create queues for
pub(crate) fn unique_queue_families(families: QueueFamilies) -> Vec<u32> {
    if families.graphics == families.present {
        vec![families.graphics]
    } else {
        vec![families.graphics, families.present]
    }
}

fn init_error(what: &str, e: impl std::fmt::Debug) -> Error {
    engine_error!("frame_forge::vulkan", "{}: {:?}", what, e);
    Error::InitializationFailed(format!("{}: {:?}", what, e))
}

/// One-shot command buffer from the upload pool, freed when dropped
struct OneShotCommands<'a> {
    device: &'a ash::Device,
    pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
}

impl Drop for OneShotCommands<'_> {
    fn drop(&mut self) {
        unsafe {
            self.device.free_command_buffers(self.pool, &[self.command_buffer]);
        }
    }
}

/// Vulkan graphics device
pub struct VulkanGraphicsDevice {
    ctx: Arc<GpuContext>,
}

impl VulkanGraphicsDevice {
    /// Create the device for `window` along with the window surface
    ///
    /// The surface is returned so the swapchain can take ownership of it.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: &Config) -> Result<(Self, Surface)> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| init_error("Failed to load Vulkan library", e))?;

            let app_name = CString::new(config.app_name.as_str())
                .map_err(|e| init_error("Invalid application name", e))?;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Frame Forge")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_0);

            let display_handle = window
                .display_handle()
                .map_err(|e| init_error("Failed to get display handle", e))?;
            let mut required_extensions: Vec<&CStr> =
                ash_window::enumerate_required_extensions(display_handle.as_raw())
                    .map_err(|e| init_error("Failed to get required extensions", e))?
                    .iter()
                    .map(|&name| CStr::from_ptr(name))
                    .collect();
            let mut required_layers: Vec<&CStr> = Vec::new();
            if config.enable_validation {
                required_extensions.push(ash::ext::debug_utils::NAME);
                required_layers.push(VALIDATION_LAYER);
            }

            let available_extensions = entry
                .enumerate_instance_extension_properties(None)
                .map_err(|e| init_error("Failed to enumerate instance extensions", e))?;
            require_names("instance extensions", &extension_names(&available_extensions), &required_extensions)?;

            let available_layers = entry
                .enumerate_instance_layer_properties()
                .map_err(|e| init_error("Failed to enumerate instance layers", e))?;
            require_names("layers", &layer_names(&available_layers), &required_layers)?;

            let extension_ptrs: Vec<*const std::ffi::c_char> =
                required_extensions.iter().map(|name| name.as_ptr()).collect();
            let layer_ptrs: Vec<*const std::ffi::c_char> = required_layers.iter().map(|name| name.as_ptr()).collect();

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_ptrs)
                .enabled_extension_names(&extension_ptrs);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_error("Failed to create Vulkan instance", e))?;

            let debug = if config.enable_validation {
                let loader = ash::ext::debug_utils::Instance::new(&entry, &instance);
                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(messenger_severities())
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                    )
                    .pfn_user_callback(Some(vulkan_debug_callback));

                let messenger = loader
                    .create_debug_utils_messenger(&debug_info, None)
                    .map_err(|e| init_error("Failed to create debug messenger", e))?;

                Some(DebugMessenger { loader, messenger })
            } else {
                None
            };

            let window_handle = window
                .window_handle()
                .map_err(|e| init_error("Failed to get window handle", e))?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| init_error("Failed to create surface", e))?;

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            // Pick the first device with graphics + present queues that can drive a swapchain
            let physical_devices = instance
                .enumerate_physical_devices()
                .map_err(|e| init_error("Failed to enumerate physical devices", e))?;

            let (physical_device, families) = physical_devices
                .iter()
                .find_map(|&physical_device| {
                    let queue_families = instance.get_physical_device_queue_family_properties(physical_device);
                    let Some(families) = select_queue_families(&queue_families, |i| {
                        surface_loader
                            .get_physical_device_surface_support(physical_device, i, surface)
                            .unwrap_or(false)
                    }) else {
                        engine_debug!("frame_forge::vulkan", "Skipping {:?}: no graphics and present queues", physical_device);
                        return None;
                    };

                    let device_extensions = instance
                        .enumerate_device_extension_properties(physical_device)
                        .unwrap_or_default();
                    let format_count = surface_loader
                        .get_physical_device_surface_formats(physical_device, surface)
                        .map(|formats| formats.len())
                        .unwrap_or(0);
                    let present_mode_count = surface_loader
                        .get_physical_device_surface_present_modes(physical_device, surface)
                        .map(|modes| modes.len())
                        .unwrap_or(0);
                    if let Some(reason) =
                        device_unsuitable_reason(&extension_names(&device_extensions), format_count, present_mode_count)
                    {
                        engine_debug!("frame_forge::vulkan", "Skipping {:?}: {}", physical_device, reason);
                        return None;
                    }

                    Some((physical_device, families))
                })
                .ok_or_else(|| {
                    engine_error!("frame_forge::vulkan", "No GPU with graphics, present and swapchain support found");
                    Error::InitializationFailed("No GPU with graphics, present and swapchain support found".to_string())
                })?;

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "Unknown".to_string());
            engine_info!(
                "frame_forge::vulkan",
                "Using {} (graphics family {}, present family {})",
                device_name,
                families.graphics,
                families.present
            );

            // Logical device
            let queue_priorities = [1.0];
            let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_queue_families(families)
                .into_iter()
                .map(|family| {
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(family)
                        .queue_priorities(&queue_priorities)
                })
                .collect();

            let device_extension_names = DEVICE_EXTENSIONS.map(|name| name.as_ptr());
            let device_features = vk::PhysicalDeviceFeatures::default();

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| init_error("Failed to create logical device", e))?;

            let graphics_queue = device.get_device_queue(families.graphics, 0);
            let present_queue = device.get_device_queue(families.present, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| init_error("Failed to create GPU allocator", e))?;

            // Per-image command buffers are re-recorded through `begin`, which resets them
            let pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(families.graphics)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let command_pool = device
                .create_command_pool(&pool_create_info, None)
                .map_err(|e| init_error("Failed to create command pool", e))?;

            let upload_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(families.graphics)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let upload_command_pool = device
                .create_command_pool(&upload_pool_create_info, None)
                .map_err(|e| init_error("Failed to create upload command pool", e))?;

            let ctx = Arc::new(GpuContext {
                _entry: entry,
                instance,
                physical_device,
                device,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                graphics_queue,
                graphics_queue_family: families.graphics,
                present_queue,
                present_queue_family: families.present,
                command_pool: Mutex::new(command_pool),
                upload_command_pool: Mutex::new(upload_command_pool),
                debug,
            });

            let surface = Surface::new(Arc::clone(&ctx), surface_loader, surface);

            Ok((Self { ctx }, surface))
        }
    }

    /// Shared GPU context
    pub fn context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn create_buffer(&self, desc: BufferDesc) -> Result<Box<dyn Buffer>> {
        if desc.size == 0 {
            engine_bail_warn!("frame_forge::vulkan", "Cannot create zero-sized buffer '{}'", desc.name);
        }

        // Device-local buffers stay a valid copy source for `read_back`
        let mut usage = buffer_usage_to_vk(desc.usage);
        if desc.location == MemoryLocation::DeviceLocal {
            usage |= vk::BufferUsageFlags::TRANSFER_SRC;
        }

        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(desc.size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = self
                .ctx
                .device
                .create_buffer(&buffer_create_info, None)
                .map_err(|e| engine_err!("frame_forge::vulkan", "Failed to create buffer of size {} bytes: {:?}", desc.size, e))?;

            let requirements = self.ctx.device.get_buffer_memory_requirements(buffer);

            let allocated = self.ctx.allocator().and_then(|mut allocator| {
                allocator
                    .allocate(&AllocationCreateDesc {
                        name: desc.name,
                        requirements,
                        location: memory_location_to_gpu(desc.location),
                        linear: true,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|e| {
                        let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                        engine_error!(
                            "frame_forge::vulkan",
                            "Out of GPU memory for buffer '{}' (required: {:.2} MB): {:?}",
                            desc.name,
                            size_mb,
                            e
                        );
                        Error::OutOfMemory
                    })
            });

            let allocation = match allocated {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.ctx.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            // Wrapped before binding so a bind failure frees both
            let vk_buffer = VulkanBuffer::new(
                Arc::clone(&self.ctx),
                buffer,
                allocation,
                desc.size,
                desc.usage,
                desc.location,
            );
            vk_buffer.bind_memory()?;

            Ok(Box::new(vk_buffer))
        }
    }

    fn copy_buffer_blocking(&self, src: &dyn Buffer, dst: &dyn Buffer, region: BufferCopy) -> Result<()> {
        let src_end = region.src_offset.checked_add(region.size);
        let dst_end = region.dst_offset.checked_add(region.size);
        if region.size == 0
            || src_end.is_none_or(|end| end > src.size())
            || dst_end.is_none_or(|end| end > dst.size())
        {
            engine_bail_warn!(
                "frame_forge::vulkan",
                "Invalid copy region {:?} (source {} bytes, destination {} bytes)",
                region,
                src.size(),
                dst.size()
            );
        }

        let vk_src = VulkanBuffer::from_dyn(src)?;
        let vk_dst = VulkanBuffer::from_dyn(dst)?;

        let device = &self.ctx.device;
        let pool = self.ctx.upload_command_pool()?;

        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| engine_err!("frame_forge::vulkan", "Failed to allocate upload command buffer: {:?}", e))?;
            let commands = OneShotCommands {
                device,
                pool: *pool,
                command_buffer: command_buffers[0],
            };

            let begin_info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device
                .begin_command_buffer(commands.command_buffer, &begin_info)
                .map_err(|e| engine_err!("frame_forge::vulkan", "Failed to begin upload command buffer: {:?}", e))?;

            let copy_region = vk::BufferCopy {
                src_offset: region.src_offset,
                dst_offset: region.dst_offset,
                size: region.size,
            };
            device.cmd_copy_buffer(commands.command_buffer, vk_src.buffer, vk_dst.buffer, &[copy_region]);

            device
                .end_command_buffer(commands.command_buffer)
                .map_err(|e| engine_err!("frame_forge::vulkan", "Failed to end upload command buffer: {:?}", e))?;

            let submit_command_buffers = [commands.command_buffer];
            let submit_info = vk::SubmitInfo::default().command_buffers(&submit_command_buffers);

            device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| engine_err!("frame_forge::vulkan", "Failed to submit buffer copy: {:?}", e))?;

            device
                .queue_wait_idle(self.ctx.graphics_queue)
                .map_err(|e| engine_err!("frame_forge::vulkan", "Failed to wait for buffer copy completion: {:?}", e))?;
        }

        Ok(())
    }

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>> {
        Ok(Box::new(VulkanFence::new(Arc::clone(&self.ctx), signaled)?))
    }

    fn create_semaphore(&self) -> Result<Box<dyn Semaphore>> {
        Ok(Box::new(VulkanSemaphore::new(Arc::clone(&self.ctx))?))
    }

    fn allocate_command_buffers(&self, count: usize) -> Result<Vec<Box<dyn CommandBuffer>>> {
        Ok(VulkanCommandBuffer::allocate(&self.ctx, count)?
            .into_iter()
            .map(|command_buffer| Box::new(command_buffer) as Box<dyn CommandBuffer>)
            .collect())
    }

    fn submit(&self, submission: &Submission<'_>) -> Result<()> {
        let command_buffer = VulkanCommandBuffer::from_dyn(submission.command_buffer)?;
        let wait_semaphore = VulkanSemaphore::from_dyn(submission.wait_semaphore)?;
        let signal_semaphore = VulkanSemaphore::from_dyn(submission.signal_semaphore)?;
        let fence = VulkanFence::from_dyn(submission.fence)?;

        let wait_semaphores = [wait_semaphore.semaphore];
        let wait_stages = [pipeline_stage_to_vk(submission.wait_stage)];
        let command_buffers = [command_buffer.command_buffer];
        let signal_semaphores = [signal_semaphore.semaphore];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], fence.fence)
                .map_err(|e| engine_err!("frame_forge::vulkan", "Failed to submit commands to GPU queue: {:?}", e))
        }
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe { self.ctx.device.device_wait_idle() }.map_err(|e| {
            engine_warn!("frame_forge::vulkan", "Device wait idle failed: {:?}", e);
            Error::BackendError(format!("Failed to wait idle: {:?}", e))
        })
    }
}
