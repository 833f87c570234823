/// Swapchain - Vulkan implementation of the Swapchain trait
///
/// Created once for the window surface and never recreated. Acquisition and
/// presentation report an out-of-date surface as `Error::SwapchainOutOfDate`.

use ash::vk;
use frame_forge::forge::render::{ImageIndex, PresentOutcome, Semaphore, Swapchain};
use frame_forge::forge::{Error, Result};
use frame_forge::{engine_debug, engine_err, engine_error, engine_info, engine_warn};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_sync::VulkanSemaphore;

// ===== SURFACE NEGOTIATION =====

/// Pick the color format of the swapchain images
///
/// Prefers 8-bit UNORM RGBA/BGRA in the sRGB non-linear color space. A
/// single UNDEFINED entry means the surface has no preference.
pub(crate) fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    let preferred = vk::SurfaceFormatKHR {
        format: vk::Format::R8G8B8A8_UNORM,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };

    if let [only] = formats {
        if only.format == vk::Format::UNDEFINED {
            return Some(preferred);
        }
    }

    formats
        .iter()
        .find(|f| {
            matches!(f.format, vk::Format::R8G8B8A8_UNORM | vk::Format::B8G8R8A8_UNORM)
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first())
        .copied()
}

/// MAILBOX when available, otherwise FIFO (always supported)
pub(crate) fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Surface extent, or the window size clamped to the surface limits when
/// the surface lets the swapchain decide
pub(crate) fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, window_size: (u32, u32)) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    let (width, height) = window_size;
    vk::Extent2D {
        width: width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// One image more than the minimum, capped by the maximum (0 means unbounded)
pub(crate) fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let image_count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        image_count.min(capabilities.max_image_count)
    } else {
        image_count
    }
}

/// Image sharing between the graphics and present queue families
pub(crate) fn sharing_mode(graphics_family: u32, present_family: u32) -> (vk::SharingMode, Vec<u32>) {
    if graphics_family == present_family {
        (vk::SharingMode::EXCLUSIVE, Vec::new())
    } else {
        (vk::SharingMode::CONCURRENT, vec![graphics_family, present_family])
    }
}

// ===== SURFACE =====

/// Window surface, destroyed after the swapchain built on it
pub struct Surface {
    ctx: Arc<GpuContext>,
    loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
}

impl Surface {
    pub(crate) fn new(ctx: Arc<GpuContext>, loader: ash::khr::surface::Instance, surface: vk::SurfaceKHR) -> Self {
        Self { ctx, loader, surface }
    }

    fn capabilities(&self) -> Result<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.loader
                .get_physical_device_surface_capabilities(self.ctx.physical_device, self.surface)
        }
        .map_err(|e| {
            engine_error!("frame_forge::vulkan", "Failed to get surface capabilities: {:?}", e);
            Error::InitializationFailed(format!("Failed to get surface capabilities: {:?}", e))
        })
    }

    fn formats(&self) -> Result<Vec<vk::SurfaceFormatKHR>> {
        unsafe {
            self.loader
                .get_physical_device_surface_formats(self.ctx.physical_device, self.surface)
        }
        .map_err(|e| {
            engine_error!("frame_forge::vulkan", "Failed to query surface formats: {:?}", e);
            Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e))
        })
    }

    fn present_modes(&self) -> Result<Vec<vk::PresentModeKHR>> {
        unsafe {
            self.loader
                .get_physical_device_surface_present_modes(self.ctx.physical_device, self.surface)
        }
        .map_err(|e| {
            engine_error!("frame_forge::vulkan", "Failed to query present modes: {:?}", e);
            Error::InitializationFailed(format!("Failed to get present modes: {:?}", e))
        })
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_surface(self.surface, None);
        }
    }
}

// ===== SWAPCHAIN =====

/// Vulkan swapchain implementation
pub struct VulkanSwapchain {
    ctx: Arc<GpuContext>,

    swapchain: vk::SwapchainKHR,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain_images: Vec<vk::Image>,
    swapchain_image_views: Vec<vk::ImageView>,
    swapchain_format: vk::Format,
    swapchain_extent: vk::Extent2D,

    /// Declared last: dropped after the swapchain is destroyed
    surface: Surface,
}

impl VulkanSwapchain {
    /// Create the swapchain and one color view per image
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared GPU context
    /// * `surface` - Window surface, owned by the swapchain from now on
    /// * `window_size` - Window size in pixels, used when the surface leaves the extent open
    pub fn new(ctx: Arc<GpuContext>, surface: Surface, window_size: (u32, u32)) -> Result<Self> {
        let capabilities = surface.capabilities()?;
        let formats = surface.formats()?;
        let present_modes = surface.present_modes()?;

        let surface_format = choose_surface_format(&formats).ok_or_else(|| {
            engine_error!("frame_forge::vulkan", "Surface reports no formats");
            Error::InitializationFailed("Surface reports no formats".to_string())
        })?;
        let present_mode = choose_present_mode(&present_modes);
        let extent = choose_extent(&capabilities, window_size);
        let image_count = choose_image_count(&capabilities);

        let (graphics_family, present_family) = ctx.queue_families();
        let (image_sharing_mode, queue_family_indices) = sharing_mode(graphics_family, present_family);

        let swapchain_create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(image_sharing_mode)
            .queue_family_indices(&queue_family_indices)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true);

        let swapchain_loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);
        let swapchain = unsafe { swapchain_loader.create_swapchain(&swapchain_create_info, None) }
            .map_err(|e| {
                engine_error!("frame_forge::vulkan", "Failed to create swapchain: {:?}", e);
                Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
            })?;

        let swapchain_images = match unsafe { swapchain_loader.get_swapchain_images(swapchain) } {
            Ok(images) => images,
            Err(e) => {
                unsafe { swapchain_loader.destroy_swapchain(swapchain, None) };
                engine_error!("frame_forge::vulkan", "Failed to get swapchain images: {:?}", e);
                return Err(Error::InitializationFailed(format!("Failed to get swapchain images: {:?}", e)));
            }
        };

        // Views are owned by `Self` as they are created so a failure drops the partial set
        let mut this = Self {
            ctx,
            swapchain,
            swapchain_loader,
            swapchain_images,
            swapchain_image_views: Vec::new(),
            swapchain_format: surface_format.format,
            swapchain_extent: extent,
            surface,
        };

        for &image in &this.swapchain_images {
            let create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(surface_format.format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            let view = unsafe { this.ctx.device.create_image_view(&create_info, None) }.map_err(|e| {
                engine_error!("frame_forge::vulkan", "Failed to create swapchain image view: {:?}", e);
                Error::InitializationFailed(format!("Failed to create image views: {:?}", e))
            })?;
            this.swapchain_image_views.push(view);
        }

        engine_info!(
            "frame_forge::vulkan",
            "Swapchain created: {} images, {}x{}, {:?}, {:?}",
            this.swapchain_images.len(),
            extent.width,
            extent.height,
            surface_format.format,
            present_mode
        );

        Ok(this)
    }

    pub fn format(&self) -> vk::Format {
        self.swapchain_format
    }

    pub fn vk_extent(&self) -> vk::Extent2D {
        self.swapchain_extent
    }

    pub(crate) fn image_views(&self) -> &[vk::ImageView] {
        &self.swapchain_image_views
    }
}

impl Swapchain for VulkanSwapchain {
    fn image_count(&self) -> usize {
        self.swapchain_images.len()
    }

    fn extent(&self) -> (u32, u32) {
        (self.swapchain_extent.width, self.swapchain_extent.height)
    }

    fn acquire_next_image(&mut self, signal: &dyn Semaphore) -> Result<ImageIndex> {
        let signal = VulkanSemaphore::from_dyn(signal)?;

        let acquired = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                signal.semaphore,
                vk::Fence::null(),
            )
        };

        match acquired {
            Ok((image_index, is_suboptimal)) => {
                if is_suboptimal {
                    engine_debug!("frame_forge::vulkan", "Swapchain suboptimal at acquire (image {})", image_index);
                }
                Ok(ImageIndex::new(image_index))
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                engine_warn!("frame_forge::vulkan", "Swapchain out of date during acquire");
                Err(Error::SwapchainOutOfDate)
            }
            Err(e) => Err(engine_err!("frame_forge::vulkan", "Failed to acquire next swapchain image: {:?}", e)),
        }
    }

    fn present(&mut self, image: ImageIndex, wait: &dyn Semaphore) -> Result<PresentOutcome> {
        let wait = VulkanSemaphore::from_dyn(wait)?;

        let swapchains = [self.swapchain];
        let image_indices = [image.get()];
        let wait_semaphores = [wait.semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { self.swapchain_loader.queue_present(self.ctx.present_queue, &present_info) } {
            Ok(false) => Ok(PresentOutcome::Optimal),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                engine_warn!("frame_forge::vulkan", "Swapchain out of date during present");
                Err(Error::SwapchainOutOfDate)
            }
            Err(e) => Err(engine_err!("frame_forge::vulkan", "Failed to present swapchain image: {:?}", e)),
        }
    }
}

impl Drop for VulkanSwapchain {
    fn drop(&mut self) {
        unsafe {
            for &image_view in &self.swapchain_image_views {
                self.ctx.device.destroy_image_view(image_view, None);
            }

            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}
