/// Pipeline - Vulkan implementation of the Pipeline trait
///
/// Fixed-function state for the frame engine's single pipeline: one
/// interleaved vertex binding, triangle lists, static viewport and scissor
/// covering the swapchain extent, back-face culling and alpha blending.

use ash::vk;
use frame_forge::forge::render::Pipeline;
use frame_forge::forge::{Error, Result, Vertex, VertexFormat};
use frame_forge::{engine_debug, engine_error};
use std::any::Any;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_render_pass::VulkanRenderPass;

pub(crate) fn vertex_format_to_vk(format: VertexFormat) -> vk::Format {
    match format {
        VertexFormat::Float32x3 => vk::Format::R32G32B32_SFLOAT,
    }
}

/// Binding and attribute descriptions of [`Vertex`]
pub(crate) fn vertex_input_descriptions() -> (
    vk::VertexInputBindingDescription,
    Vec<vk::VertexInputAttributeDescription>,
) {
    let binding = vk::VertexInputBindingDescription {
        binding: Vertex::BINDING,
        stride: Vertex::STRIDE,
        input_rate: vk::VertexInputRate::VERTEX,
    };

    let attributes = Vertex::ATTRIBUTES
        .iter()
        .map(|attribute| vk::VertexInputAttributeDescription {
            location: attribute.location,
            binding: Vertex::BINDING,
            format: vertex_format_to_vk(attribute.format),
            offset: attribute.offset,
        })
        .collect();

    (binding, attributes)
}

/// Read a SPIR-V binary into 32-bit words
pub(crate) fn load_spirv(path: &Path) -> Result<Vec<u32>> {
    let mut file = File::open(path).map_err(|e| {
        engine_error!("frame_forge::vulkan", "Failed to open shader {}: {}", path.display(), e);
        Error::InitializationFailed(format!("Failed to open shader {}: {}", path.display(), e))
    })?;

    ash::util::read_spv(&mut file).map_err(|e| {
        engine_error!("frame_forge::vulkan", "Invalid SPIR-V in {}: {}", path.display(), e);
        Error::InitializationFailed(format!("Invalid SPIR-V in {}: {}", path.display(), e))
    })
}

/// Shader module destroyed when dropped (only needed during pipeline creation)
struct ShaderModule<'a> {
    device: &'a ash::Device,
    module: vk::ShaderModule,
}

impl<'a> ShaderModule<'a> {
    fn new(device: &'a ash::Device, path: &Path) -> Result<Self> {
        let code = load_spirv(path)?;
        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);

        let module = unsafe { device.create_shader_module(&create_info, None) }.map_err(|e| {
            engine_error!("frame_forge::vulkan", "Failed to create shader module {}: {:?}", path.display(), e);
            Error::InitializationFailed(format!("Failed to create shader module: {:?}", e))
        })?;

        Ok(Self { device, module })
    }
}

impl Drop for ShaderModule<'_> {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

/// Vulkan graphics pipeline implementation
pub struct VulkanPipeline {
    ctx: Arc<GpuContext>,
    pub(crate) pipeline: vk::Pipeline,
    pipeline_layout: vk::PipelineLayout,
}

impl VulkanPipeline {
    pub fn new(
        ctx: Arc<GpuContext>,
        render_pass: &VulkanRenderPass,
        extent: vk::Extent2D,
        vertex_shader: &Path,
        fragment_shader: &Path,
    ) -> Result<Self> {
        let device = &ctx.device;
        let vertex_module = ShaderModule::new(device, vertex_shader)?;
        let fragment_module = ShaderModule::new(device, fragment_shader)?;

        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex_module.module)
                .name(c"main"),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment_module.module)
                .name(c"main"),
        ];

        let (binding, attributes) = vertex_input_descriptions();
        let bindings = [binding];
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Viewport state (static: the surface is never resized)
        let viewports = [vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }];
        let scissors = [vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        }];
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::CLOCKWISE)
            .depth_bias_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
            .alpha_blend_op(vk::BlendOp::ADD);

        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(std::slice::from_ref(&color_blend_attachment));

        // No descriptor sets, no push constants
        let layout_create_info = vk::PipelineLayoutCreateInfo::default();
        let pipeline_layout = unsafe { device.create_pipeline_layout(&layout_create_info, None) }
            .map_err(|e| {
                engine_error!("frame_forge::vulkan", "Failed to create pipeline layout: {:?}", e);
                Error::InitializationFailed(format!("Failed to create pipeline layout: {:?}", e))
            })?;

        let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .layout(pipeline_layout)
            .render_pass(render_pass.render_pass)
            .subpass(0);

        let pipelines = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_create_info], None)
        };
        let pipeline = match pipelines {
            Ok(pipelines) => pipelines[0],
            Err((_, e)) => {
                unsafe { device.destroy_pipeline_layout(pipeline_layout, None) };
                engine_error!("frame_forge::vulkan", "Failed to create graphics pipeline: {:?}", e);
                return Err(Error::InitializationFailed(format!("Failed to create graphics pipeline: {:?}", e)));
            }
        };

        engine_debug!(
            "frame_forge::vulkan",
            "Graphics pipeline created ({}x{}, shaders {} / {})",
            extent.width,
            extent.height,
            vertex_shader.display(),
            fragment_shader.display()
        );

        drop(vertex_module);
        drop(fragment_module);
        Ok(Self { ctx, pipeline, pipeline_layout })
    }

    pub(crate) fn from_dyn(pipeline: &dyn Pipeline) -> Result<&VulkanPipeline> {
        pipeline
            .as_any()
            .downcast_ref::<VulkanPipeline>()
            .ok_or_else(|| Error::InvalidResource("Pipeline was not created by the Vulkan backend".to_string()))
    }
}

impl Pipeline for VulkanPipeline {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanPipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
            self.ctx.device.destroy_pipeline_layout(self.pipeline_layout, None);
        }
    }
}
