//! Command-buffer recording
//!
//! Each swapchain image gets one command buffer, recorded once at startup
//! and resubmitted every time the image comes back. Changing the mesh list
//! afterwards would require recording every target again.

use crate::error::Result;
use crate::frame_cycle::SwapchainTarget;
use crate::graphics_device::{CommandBuffer, CommandBufferUsage, Framebuffer, Pipeline, RenderPass};
use crate::mesh::Mesh;
use crate::vertex::Vertex;
use crate::{engine_debug, engine_error};

/// Record the draw commands of every target, in target order
pub fn record_draw_commands(
    targets: &mut [SwapchainTarget],
    render_pass: &dyn RenderPass,
    pipeline: &dyn Pipeline,
    meshes: &[Mesh],
    clear_color: [f32; 4],
) -> Result<()> {
    for target in targets.iter_mut() {
        let image = target.image();
        let (framebuffer, command_buffer) = target.parts_mut();
        record_target(command_buffer, framebuffer, render_pass, pipeline, meshes, clear_color)
            .inspect_err(|e| engine_error!("frame_forge::command_recorder", "Recording {} failed: {}", image, e))?;
    }

    engine_debug!(
        "frame_forge::command_recorder",
        "Recorded {} command buffers with {} meshes each",
        targets.len(),
        meshes.len()
    );
    Ok(())
}

fn record_target(
    command_buffer: &mut dyn CommandBuffer,
    framebuffer: &dyn Framebuffer,
    render_pass: &dyn RenderPass,
    pipeline: &dyn Pipeline,
    meshes: &[Mesh],
    clear_color: [f32; 4],
) -> Result<()> {
    command_buffer.begin(CommandBufferUsage::SimultaneousUse)?;
    command_buffer.begin_render_pass(render_pass, framebuffer, clear_color)?;
    command_buffer.bind_pipeline(pipeline)?;

    for mesh in meshes {
        command_buffer.bind_vertex_buffer(mesh.vertex_buffer(), Vertex::BINDING, 0)?;
        command_buffer.bind_index_buffer(mesh.index_buffer(), 0, Mesh::INDEX_TYPE)?;
        command_buffer.draw_indexed(mesh.index_count(), 1, 0, 0, 0)?;
    }

    command_buffer.end_render_pass()?;
    command_buffer.end()
}

#[cfg(test)]
#[path = "command_recorder_tests.rs"]
mod tests;
