//! Frame driver: one acquire, submit, present cycle
//!
//! Synchronization objects are addressed by the current [`FrameSlotIndex`];
//! the command buffer and framebuffer by the acquired [`ImageIndex`].

use crate::error::{Error, Result};
use crate::frame_cycle::{target_for, FrameCycle, FrameSlotIndex, SwapchainTarget};
use crate::graphics_device::{
    GraphicsDevice, ImageIndex, PipelineStage, PresentOutcome, Submission, Swapchain,
};
use crate::{engine_error, engine_trace, engine_warn};

/// Which slot and which image a frame used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub slot: FrameSlotIndex,
    pub image: ImageIndex,
}

/// Run one frame and rotate to the next slot
///
/// 1. wait on the current slot's fence, then reset it
/// 2. acquire an image, signaling the slot's image-available semaphore
/// 3. if another slot's submission still renders that image, wait on its fence
/// 4. submit the image's command buffer (wait image-available at color
///    attachment output, signal render-finished, fence the slot)
/// 5. present, waiting on render-finished
/// 6. advance the slot cursor
///
/// # Errors
///
/// - `FrameFailed` if a wait, submission or presentation fails
/// - `SwapchainOutOfDate` if the surface no longer matches the swapchain
pub fn draw_frame(
    device: &dyn GraphicsDevice,
    swapchain: &mut dyn Swapchain,
    cycle: &mut FrameCycle,
    targets: &[SwapchainTarget],
) -> Result<FrameReport> {
    let slot_index = cycle.current();
    let slot = cycle.slot(slot_index);

    // The reset must follow a successful wait, or a pending slot would look idle
    slot.fence().wait().map_err(|e| frame_failure("fence wait", slot_index, e))?;
    slot.fence().reset().map_err(|e| frame_failure("fence reset", slot_index, e))?;

    let image = swapchain
        .acquire_next_image(slot.image_available())
        .map_err(|e| frame_failure("acquire", slot_index, e))?;
    let target = target_for(targets, image)?;
    engine_trace!("frame_forge::frame_driver", "{} acquired {}", slot_index, image);

    if let Some(owner) = cycle.image_owner(image) {
        if owner != slot_index {
            engine_trace!("frame_forge::frame_driver", "{} still owned by {}, waiting", image, owner);
            cycle
                .slot(owner)
                .fence()
                .wait()
                .map_err(|e| frame_failure("image owner wait", owner, e))?;
        }
    }
    cycle.claim_image(image, slot_index)?;

    let slot = cycle.slot(slot_index);
    device
        .submit(&Submission {
            command_buffer: target.command_buffer(),
            wait_semaphore: slot.image_available(),
            wait_stage: PipelineStage::ColorAttachmentOutput,
            signal_semaphore: slot.render_finished(),
            fence: slot.fence(),
        })
        .map_err(|e| frame_failure("submit", slot_index, e))?;

    let outcome = swapchain
        .present(image, slot.render_finished())
        .map_err(|e| frame_failure("present", slot_index, e))?;
    match outcome {
        PresentOutcome::Optimal => {}
        PresentOutcome::Suboptimal => {
            engine_warn!("frame_forge::frame_driver", "Swapchain is suboptimal for the surface ({})", image);
        }
    }

    cycle.advance();
    Ok(FrameReport { slot: slot_index, image })
}

/// Log a per-frame failure and turn it into `FrameFailed`
///
/// An out-of-date swapchain keeps its own variant.
fn frame_failure(step: &str, slot: FrameSlotIndex, error: Error) -> Error {
    match error {
        Error::SwapchainOutOfDate | Error::FrameFailed(_) => {
            engine_error!("frame_forge::frame_driver", "{} failed on {}: {}", step, slot, error);
            error
        }
        other => {
            engine_error!("frame_forge::frame_driver", "{} failed on {}: {}", step, slot, other);
            Error::FrameFailed(format!("{} failed on {}: {}", step, slot, other))
        }
    }
}

#[cfg(test)]
#[path = "frame_driver_tests.rs"]
mod tests;
