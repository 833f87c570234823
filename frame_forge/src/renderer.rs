//! Renderer: Init, Draw and CleanUp
//!
//! Owns the geometry, the frame cycle and the backend objects produced by the
//! device setup, and drives one frame per [`Renderer::draw`] call.
//!
//! # Example
//!
//! ```no_run
//! use frame_forge::forge::{Config, GeometryDesc, Renderer, RendererParts};
//!
//! fn run(parts: RendererParts, geometry: &[GeometryDesc]) -> frame_forge::forge::Result<()> {
//!     let mut renderer = Renderer::new(parts, geometry, &Config::default())?;
//!     for _ in 0..3 {
//!         renderer.draw()?;
//!     }
//!     renderer.clean_up()
//! }
//! ```

use std::sync::Arc;

use crate::command_recorder::record_draw_commands;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::frame_cycle::{FrameCycle, SwapchainTarget};
use crate::frame_driver::{draw_frame, FrameReport};
use crate::graphics_device::{Framebuffer, GraphicsDevice, ImageIndex, Pipeline, RenderPass, Swapchain};
use crate::mesh::{GeometryDesc, Mesh};
use crate::{engine_bail_warn, engine_error, engine_info, engine_warn};

/// Backend objects the renderer is built from
pub struct RendererParts {
    pub device: Arc<dyn GraphicsDevice>,
    pub swapchain: Box<dyn Swapchain>,
    pub render_pass: Box<dyn RenderPass>,
    pub pipeline: Box<dyn Pipeline>,
    /// One framebuffer per swapchain image, in image order
    pub framebuffers: Vec<Box<dyn Framebuffer>>,
}

/// Everything destroyed at teardown, in destruction order
struct FrameResources {
    meshes: Vec<Mesh>,
    frame_cycle: FrameCycle,
    targets: Vec<SwapchainTarget>,
    pipeline: Box<dyn Pipeline>,
    render_pass: Box<dyn RenderPass>,
    swapchain: Box<dyn Swapchain>,
}

impl FrameResources {
    fn destroy(self) {
        let FrameResources { meshes, frame_cycle, targets, pipeline, render_pass, swapchain } = self;
        drop(meshes);
        drop(frame_cycle);
        let (framebuffers, command_buffers): (Vec<_>, Vec<_>) =
            targets.into_iter().map(SwapchainTarget::into_parts).unzip();
        drop(command_buffers);
        drop(framebuffers);
        drop(pipeline);
        drop(render_pass);
        drop(swapchain);
    }
}

pub struct Renderer {
    resources: Option<FrameResources>,
    device: Arc<dyn GraphicsDevice>,
    /// Cause of the first failed frame; the failed slot's fence is left unsignaled
    failure: Option<String>,
}

impl Renderer {
    /// Upload the geometry, record one command buffer per swapchain image
    /// and create the frame slots
    ///
    /// # Errors
    ///
    /// - `InvalidResource` if the framebuffer count differs from the image count
    /// - any upload, allocation or recording failure
    pub fn new(parts: RendererParts, geometry: &[GeometryDesc], config: &Config) -> Result<Self> {
        let RendererParts { device, swapchain, render_pass, pipeline, framebuffers } = parts;

        let image_count = swapchain.image_count();
        if framebuffers.len() != image_count {
            engine_bail_warn!(
                "frame_forge::renderer",
                "{} framebuffers for {} swapchain images",
                framebuffers.len(),
                image_count
            );
        }

        let meshes = geometry
            .iter()
            .map(|desc| Mesh::from_desc(device.as_ref(), desc))
            .collect::<Result<Vec<_>>>()?;

        let command_buffers = device.allocate_command_buffers(image_count)?;
        let mut targets: Vec<SwapchainTarget> = framebuffers
            .into_iter()
            .zip(command_buffers)
            .enumerate()
            .map(|(i, (framebuffer, command_buffer))| {
                SwapchainTarget::new(ImageIndex::new(i as u32), framebuffer, command_buffer)
            })
            .collect();

        record_draw_commands(&mut targets, render_pass.as_ref(), pipeline.as_ref(), &meshes, config.clear_color)?;

        let frame_cycle = FrameCycle::new(device.as_ref(), config.frames_in_flight(), image_count)?;

        engine_info!(
            "frame_forge::renderer",
            "Renderer ready: {} meshes, {} swapchain images, {} frames in flight",
            meshes.len(),
            image_count,
            frame_cycle.slot_count()
        );

        Ok(Self {
            resources: Some(FrameResources {
                meshes,
                frame_cycle,
                targets,
                pipeline,
                render_pass,
                swapchain,
            }),
            device,
            failure: None,
        })
    }

    /// Render and present one frame
    ///
    /// # Errors
    ///
    /// `FrameFailed` or `SwapchainOutOfDate`; neither is recoverable. Once a
    /// frame has failed, every later call returns `FrameFailed` without
    /// touching the device.
    pub fn draw(&mut self) -> Result<FrameReport> {
        if let Some(cause) = &self.failure {
            engine_warn!("frame_forge::renderer", "draw called after a failed frame ({})", cause);
            return Err(Error::FrameFailed(format!("renderer stopped after a failed frame: {}", cause)));
        }
        let Some(resources) = self.resources.as_mut() else {
            return Err(crate::engine_err!("frame_forge::renderer", "draw called after clean up"));
        };
        draw_frame(
            self.device.as_ref(),
            resources.swapchain.as_mut(),
            &mut resources.frame_cycle,
            &resources.targets,
        )
        .inspect_err(|e| self.failure = Some(e.to_string()))
    }

    /// Whether a frame has failed and drawing has stopped
    pub fn has_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Wait for the device to go idle, then destroy every resource
    ///
    /// Meshes, frame slots, command buffers, framebuffers, pipeline, render
    /// pass and swapchain are destroyed in that order. The device goes once
    /// the last object holding it is gone.
    pub fn clean_up(mut self) -> Result<()> {
        self.teardown()
    }

    pub fn meshes(&self) -> &[Mesh] {
        match &self.resources {
            Some(resources) => &resources.meshes,
            None => &[],
        }
    }

    pub fn frame_cycle(&self) -> Option<&FrameCycle> {
        self.resources.as_ref().map(|r| &r.frame_cycle)
    }

    pub fn targets(&self) -> &[SwapchainTarget] {
        match &self.resources {
            Some(resources) => &resources.targets,
            None => &[],
        }
    }

    fn teardown(&mut self) -> Result<()> {
        let Some(resources) = self.resources.take() else {
            return Ok(());
        };

        // Destruction happens even if the wait fails: a lost device runs nothing
        let idle = self
            .device
            .wait_idle()
            .inspect_err(|e| engine_error!("frame_forge::renderer", "Device wait idle failed: {}", e));
        resources.destroy();
        engine_info!("frame_forge::renderer", "Renderer cleaned up");
        idle
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.teardown().ok();
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
