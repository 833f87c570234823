//! Frame resource set
//!
//! A fixed ring of frame slots, each holding the synchronization objects of
//! one in-flight frame, plus the per-image targets the frames render into.
//! Slots and images rotate independently: slot `k` is reused every
//! `MAX_FRAMES_IN_FLIGHT` frames, while the image order is chosen by the
//! compositor.

use std::fmt;

use crate::error::Result;
use crate::graphics_device::{CommandBuffer, Fence, Framebuffer, GraphicsDevice, ImageIndex, Semaphore};
use crate::{engine_bail, engine_debug};

/// Number of frames the CPU may record ahead of the GPU
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Index of a frame slot in the ring
///
/// Addresses synchronization objects. Never interchangeable with an
/// [`ImageIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameSlotIndex(usize);

impl FrameSlotIndex {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for FrameSlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

/// Synchronization objects of one in-flight frame
///
/// The fence starts signaled so the first wait on a fresh slot returns at once.
pub struct FrameSlot {
    fence: Box<dyn Fence>,
    image_available: Box<dyn Semaphore>,
    render_finished: Box<dyn Semaphore>,
}

impl FrameSlot {
    pub fn new(device: &dyn GraphicsDevice) -> Result<Self> {
        Ok(Self {
            fence: device.create_fence(true)?,
            image_available: device.create_semaphore()?,
            render_finished: device.create_semaphore()?,
        })
    }

    /// Signaled when the slot's last submission has finished executing
    pub fn fence(&self) -> &dyn Fence {
        self.fence.as_ref()
    }

    /// Signaled by acquisition, waited on by the submission
    pub fn image_available(&self) -> &dyn Semaphore {
        self.image_available.as_ref()
    }

    /// Signaled by the submission, waited on by presentation
    pub fn render_finished(&self) -> &dyn Semaphore {
        self.render_finished.as_ref()
    }
}

/// Everything bound to one swapchain image
pub struct SwapchainTarget {
    image: ImageIndex,
    framebuffer: Box<dyn Framebuffer>,
    command_buffer: Box<dyn CommandBuffer>,
}

impl SwapchainTarget {
    pub fn new(image: ImageIndex, framebuffer: Box<dyn Framebuffer>, command_buffer: Box<dyn CommandBuffer>) -> Self {
        Self { image, framebuffer, command_buffer }
    }

    pub fn image(&self) -> ImageIndex {
        self.image
    }

    pub fn framebuffer(&self) -> &dyn Framebuffer {
        self.framebuffer.as_ref()
    }

    pub fn command_buffer(&self) -> &dyn CommandBuffer {
        self.command_buffer.as_ref()
    }

    /// Framebuffer and command buffer borrowed together, for recording
    pub fn parts_mut(&mut self) -> (&dyn Framebuffer, &mut dyn CommandBuffer) {
        (self.framebuffer.as_ref(), self.command_buffer.as_mut())
    }

    pub fn into_parts(self) -> (Box<dyn Framebuffer>, Box<dyn CommandBuffer>) {
        (self.framebuffer, self.command_buffer)
    }
}

/// Look up the target of an acquired image
pub fn target_for(targets: &[SwapchainTarget], image: ImageIndex) -> Result<&SwapchainTarget> {
    match targets.get(image.as_usize()) {
        Some(target) => Ok(target),
        None => engine_bail!(
            "frame_forge::frame_cycle",
            "Acquired {} but only {} targets exist",
            image,
            targets.len()
        ),
    }
}

/// The ring of frame slots and the current-slot cursor
pub struct FrameCycle {
    slots: Vec<FrameSlot>,
    current: FrameSlotIndex,
    /// Slot whose submission last rendered each image
    image_owners: Vec<Option<FrameSlotIndex>>,
}

impl FrameCycle {
    /// Preallocate `slot_count` slots for a swapchain of `image_count` images
    pub fn new(device: &dyn GraphicsDevice, slot_count: usize, image_count: usize) -> Result<Self> {
        if slot_count == 0 || image_count == 0 {
            engine_bail!(
                "frame_forge::frame_cycle",
                "Frame cycle needs at least one slot and one image (slots: {}, images: {})",
                slot_count,
                image_count
            );
        }

        let slots = (0..slot_count)
            .map(|_| FrameSlot::new(device))
            .collect::<Result<Vec<_>>>()?;

        engine_debug!(
            "frame_forge::frame_cycle",
            "Created {} frame slots for {} swapchain images",
            slot_count,
            image_count
        );

        Ok(Self {
            slots,
            current: FrameSlotIndex(0),
            image_owners: vec![None; image_count],
        })
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn image_count(&self) -> usize {
        self.image_owners.len()
    }

    pub fn current(&self) -> FrameSlotIndex {
        self.current
    }

    pub fn slot(&self, index: FrameSlotIndex) -> &FrameSlot {
        &self.slots[index.0]
    }

    pub fn current_slot(&self) -> &FrameSlot {
        self.slot(self.current)
    }

    /// Move to the next slot: `current = (current + 1) mod N`
    pub fn advance(&mut self) {
        self.current = FrameSlotIndex((self.current.0 + 1) % self.slots.len());
    }

    /// Slot whose submission last rendered `image`, if any
    pub fn image_owner(&self, image: ImageIndex) -> Option<FrameSlotIndex> {
        self.image_owners.get(image.as_usize()).copied().flatten()
    }

    /// Record that `slot` is about to render `image`
    pub fn claim_image(&mut self, image: ImageIndex, slot: FrameSlotIndex) -> Result<()> {
        let count = self.image_owners.len();
        match self.image_owners.get_mut(image.as_usize()) {
            Some(owner) => {
                *owner = Some(slot);
                Ok(())
            }
            None => engine_bail!(
                "frame_forge::frame_cycle",
                "Cannot claim {}: swapchain has {} images",
                image,
                count
            ),
        }
    }
}

#[cfg(test)]
#[path = "frame_cycle_tests.rs"]
mod tests;
