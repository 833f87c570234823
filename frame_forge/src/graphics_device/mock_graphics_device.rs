//! Mock graphics device for unit tests (no GPU required)
//!
//! Every call is appended to a shared event log, and the device simulates GPU
//! completion: a submission finishes when its fence is waited on or when the
//! device is waited idle, a copy finishes at the next queue-idle wait.
//! Misuse that a real driver would turn into undefined behavior (reusing a
//! pending fence, destroying a buffer a pending transfer still reads,
//! resubmitting an in-flight command buffer, submitting commands that name a
//! destroyed pipeline, render pass or framebuffer) is recorded as a violation instead of panicking, so tests can
//! assert on it.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use crate::graphics_device::{
    Buffer, BufferCopy, BufferDesc, BufferUsage, CommandBuffer, CommandBufferUsage, Fence,
    Framebuffer, GraphicsDevice, ImageIndex, IndexType, MemoryLocation, Pipeline, PresentOutcome,
    RenderPass, Semaphore, Submission, Swapchain,
};
use crate::renderer::RendererParts;

pub type ObjectId = u64;

// ============================================================================
// EVENTS
// ============================================================================

/// Observable device activity, in call order
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    CreateBuffer { id: ObjectId, size: u64, usage: BufferUsage, location: MemoryLocation },
    WriteBuffer { id: ObjectId, offset: u64, len: u64 },
    CopyBuffer { src: ObjectId, dst: ObjectId, size: u64 },
    QueueWaitIdle,
    DestroyBuffer { id: ObjectId },
    CreateFence { id: ObjectId, signaled: bool },
    WaitFence { id: ObjectId, completed: Option<u64> },
    ResetFence { id: ObjectId },
    DestroyFence { id: ObjectId },
    CreateSemaphore { id: ObjectId },
    DestroySemaphore { id: ObjectId },
    AllocateCommandBuffer { id: ObjectId },
    FreeCommandBuffer { id: ObjectId },
    Acquire { image: u32, semaphore: ObjectId },
    Submit {
        submission: u64,
        command_buffer: ObjectId,
        wait_semaphore: ObjectId,
        signal_semaphore: ObjectId,
        fence: ObjectId,
    },
    Present { image: u32, semaphore: ObjectId },
    DeviceWaitIdle,
    DestroyFramebuffer { id: ObjectId },
    DestroyPipeline { id: ObjectId },
    DestroyRenderPass { id: ObjectId },
    DestroySwapchain { id: ObjectId },
}

/// Command recorded into a [`MockCommandBuffer`]
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    Begin { usage: CommandBufferUsage },
    BeginRenderPass { render_pass: ObjectId, framebuffer: ObjectId, extent: (u32, u32), clear_color: [f32; 4] },
    BindPipeline { pipeline: ObjectId },
    BindVertexBuffer { buffer: ObjectId, binding: u32, offset: u64 },
    BindIndexBuffer { buffer: ObjectId, offset: u64, index_type: IndexType },
    DrawIndexed { index_count: u32, instance_count: u32, first_index: u32, vertex_offset: i32, first_instance: u32 },
    EndRenderPass,
    End,
}

// ============================================================================
// SHARED STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFenceState {
    Signaled,
    Unsignaled,
    /// Fence of a submission that has not completed yet
    Pending(u64),
}

struct BufferRecord {
    data: Vec<u8>,
    location: MemoryLocation,
}

#[derive(Default)]
struct CommandBufferRecord {
    executable: bool,
    in_flight: Option<u64>,
    referenced_buffers: Vec<ObjectId>,
    referenced_objects: Vec<ObjectId>,
}

struct SubmissionRecord {
    command_buffer: ObjectId,
    fence: ObjectId,
    complete: bool,
}

struct PendingCopy {
    src: ObjectId,
    dst: ObjectId,
    region: BufferCopy,
}

/// State shared by the mock device and every object it created
#[derive(Default)]
pub struct MockState {
    next_id: ObjectId,
    events: Vec<MockEvent>,
    violations: Vec<String>,
    buffers: FxHashMap<ObjectId, BufferRecord>,
    fences: FxHashMap<ObjectId, MockFenceState>,
    semaphores: FxHashMap<ObjectId, bool>,
    command_buffers: FxHashMap<ObjectId, CommandBufferRecord>,
    destroyed_objects: FxHashSet<ObjectId>,
    submissions: Vec<SubmissionRecord>,
    pending_copies: Vec<PendingCopy>,
    buffer_creations: usize,
    fail_buffer_creation_at: Option<usize>,
    skip_transfer_wait: bool,
    fail_submit: bool,
}

impl MockState {
    fn allocate_id(&mut self) -> ObjectId {
        self.next_id += 1;
        self.next_id
    }

    fn violation(&mut self, message: String) {
        self.violations.push(message);
    }

    fn complete_submission(&mut self, submission: u64) {
        let Some(record) = self.submissions.get_mut(submission as usize) else {
            return;
        };
        if record.complete {
            return;
        }
        record.complete = true;
        let (command_buffer, fence) = (record.command_buffer, record.fence);
        if let Some(cb) = self.command_buffers.get_mut(&command_buffer) {
            if cb.in_flight == Some(submission) {
                cb.in_flight = None;
            }
        }
        if let Some(state) = self.fences.get_mut(&fence) {
            if *state == MockFenceState::Pending(submission) {
                *state = MockFenceState::Signaled;
            }
        }
    }

    fn complete_all_submissions(&mut self) {
        for submission in 0..self.submissions.len() as u64 {
            self.complete_submission(submission);
        }
    }

    fn complete_copies(&mut self) {
        for copy in std::mem::take(&mut self.pending_copies) {
            let src_range = copy.region.src_offset as usize..(copy.region.src_offset + copy.region.size) as usize;
            let bytes = match self.buffers.get(&copy.src) {
                Some(src) => src.data[src_range].to_vec(),
                None => continue,
            };
            if let Some(dst) = self.buffers.get_mut(&copy.dst) {
                let start = copy.region.dst_offset as usize;
                dst.data[start..start + bytes.len()].copy_from_slice(&bytes);
            }
        }
    }

    fn has_pending_submissions(&self) -> bool {
        self.submissions.iter().any(|s| !s.complete)
    }

    fn check_no_pending_work(&mut self, object: &str) {
        if self.has_pending_submissions() {
            self.violation(format!("{} destroyed while submissions are still executing", object));
        }
    }

    fn reference_object(&mut self, command_buffer: ObjectId, object: ObjectId) {
        if let Some(record) = self.command_buffers.get_mut(&command_buffer) {
            record.referenced_objects.push(object);
        }
    }

    fn destroy_object(&mut self, object: &str, id: ObjectId) {
        self.check_no_pending_work(object);
        self.destroyed_objects.insert(id);
    }

    fn signal_semaphore(&mut self, id: ObjectId, by: &str) {
        let signaled = self.semaphores.get(&id).copied().unwrap_or(false);
        if signaled {
            self.violation(format!("{} signals semaphore {} that is already signaled", by, id));
        }
        self.semaphores.insert(id, true);
    }

    fn consume_semaphore(&mut self, id: ObjectId, by: &str) {
        let signaled = self.semaphores.get(&id).copied().unwrap_or(false);
        if !signaled {
            self.violation(format!("{} waits on semaphore {} that nothing signals", by, id));
        }
        self.semaphores.insert(id, false);
    }
}

type SharedState = Arc<Mutex<MockState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, MockState> {
    state.lock().unwrap()
}

// ============================================================================
// DOWNCAST HELPERS
// ============================================================================

fn buffer_id(buffer: &dyn Buffer) -> Result<ObjectId> {
    buffer
        .as_any()
        .downcast_ref::<MockBuffer>()
        .map(|b| b.id)
        .ok_or_else(|| Error::InvalidResource("not a mock buffer".to_string()))
}

fn fence_id(fence: &dyn Fence) -> Result<ObjectId> {
    fence
        .as_any()
        .downcast_ref::<MockFence>()
        .map(|f| f.id)
        .ok_or_else(|| Error::InvalidResource("not a mock fence".to_string()))
}

fn semaphore_id(semaphore: &dyn Semaphore) -> Result<ObjectId> {
    semaphore
        .as_any()
        .downcast_ref::<MockSemaphore>()
        .map(|s| s.id)
        .ok_or_else(|| Error::InvalidResource("not a mock semaphore".to_string()))
}

fn command_buffer_id(command_buffer: &dyn CommandBuffer) -> Result<ObjectId> {
    command_buffer
        .as_any()
        .downcast_ref::<MockCommandBuffer>()
        .map(|c| c.id)
        .ok_or_else(|| Error::InvalidResource("not a mock command buffer".to_string()))
}

// ============================================================================
// MOCK DEVICE
// ============================================================================

/// Mock device; clones share the same state
#[derive(Clone)]
pub struct MockGraphicsDevice {
    state: SharedState,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self { state: Arc::new(Mutex::new(MockState::default())) }
    }

    /// Snapshot of the event log
    pub fn events(&self) -> Vec<MockEvent> {
        lock(&self.state).events.clone()
    }

    pub fn clear_events(&self) {
        lock(&self.state).events.clear();
    }

    pub fn violations(&self) -> Vec<String> {
        lock(&self.state).violations.clone()
    }

    pub fn submission_count(&self) -> usize {
        lock(&self.state).submissions.len()
    }

    /// Contents of any mock buffer, bypassing host visibility
    pub fn buffer_contents(&self, id: ObjectId) -> Option<Vec<u8>> {
        lock(&self.state).buffers.get(&id).map(|b| b.data.clone())
    }

    pub fn fence_state(&self, id: ObjectId) -> Option<MockFenceState> {
        lock(&self.state).fences.get(&id).copied()
    }

    /// Make the `n`th buffer creation (0-based) fail with `OutOfMemory`
    pub fn fail_buffer_creation_at(&self, n: usize) {
        lock(&self.state).fail_buffer_creation_at = Some(n);
    }

    /// Make `copy_buffer_blocking` return without waiting for the transfer
    pub fn skip_transfer_wait(&self) {
        lock(&self.state).skip_transfer_wait = true;
    }

    /// Make every following submission fail
    pub fn fail_submit(&self) {
        lock(&self.state).fail_submit = true;
    }

    /// Build a swapchain that hands out images round-robin
    pub fn create_swapchain(&self, image_count: u32) -> MockSwapchain {
        let id = lock(&self.state).allocate_id();
        MockSwapchain {
            id,
            state: self.state.clone(),
            image_count,
            extent: (800, 600),
            acquire_order: Vec::new(),
            acquire_calls: 0,
            held: vec![false; image_count as usize],
            out_of_date_at: None,
            suboptimal_at: None,
            present_calls: 0,
        }
    }

    pub fn create_render_pass(&self) -> MockRenderPass {
        let id = lock(&self.state).allocate_id();
        MockRenderPass { id, state: self.state.clone() }
    }

    pub fn create_pipeline(&self) -> MockPipeline {
        let id = lock(&self.state).allocate_id();
        MockPipeline { id, state: self.state.clone() }
    }

    pub fn create_framebuffer(&self, width: u32, height: u32) -> MockFramebuffer {
        let id = lock(&self.state).allocate_id();
        MockFramebuffer { id, width, height, state: self.state.clone() }
    }

    /// Everything a renderer needs, with `image_count` swapchain images
    pub fn renderer_parts(&self, image_count: u32) -> RendererParts {
        self.renderer_parts_with(self.create_swapchain(image_count))
    }

    pub fn renderer_parts_with(&self, swapchain: MockSwapchain) -> RendererParts {
        let (width, height) = swapchain.extent;
        let framebuffers = (0..swapchain.image_count)
            .map(|_| Box::new(self.create_framebuffer(width, height)) as Box<dyn Framebuffer>)
            .collect();
        RendererParts {
            device: Arc::new(self.clone()),
            swapchain: Box::new(swapchain),
            render_pass: Box::new(self.create_render_pass()),
            pipeline: Box::new(self.create_pipeline()),
            framebuffers,
        }
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_buffer(&self, desc: BufferDesc) -> Result<Box<dyn Buffer>> {
        let mut state = lock(&self.state);
        let attempt = state.buffer_creations;
        state.buffer_creations += 1;
        if state.fail_buffer_creation_at == Some(attempt) {
            return Err(Error::OutOfMemory);
        }
        if desc.size == 0 {
            return Err(Error::InvalidResource("zero-sized buffer".to_string()));
        }

        let id = state.allocate_id();
        state.buffers.insert(id, BufferRecord { data: vec![0; desc.size as usize], location: desc.location });
        state.events.push(MockEvent::CreateBuffer {
            id,
            size: desc.size,
            usage: desc.usage,
            location: desc.location,
        });
        drop(state);

        Ok(Box::new(MockBuffer {
            id,
            size: desc.size,
            usage: desc.usage,
            location: desc.location,
            state: self.state.clone(),
        }))
    }

    fn copy_buffer_blocking(&self, src: &dyn Buffer, dst: &dyn Buffer, region: BufferCopy) -> Result<()> {
        let (src_id, dst_id) = (buffer_id(src)?, buffer_id(dst)?);
        if region.src_offset + region.size > src.size() || region.dst_offset + region.size > dst.size() {
            return Err(Error::InvalidResource("copy region out of bounds".to_string()));
        }

        let mut state = lock(&self.state);
        state.pending_copies.push(PendingCopy { src: src_id, dst: dst_id, region });
        state.events.push(MockEvent::CopyBuffer { src: src_id, dst: dst_id, size: region.size });
        if !state.skip_transfer_wait {
            state.events.push(MockEvent::QueueWaitIdle);
            state.complete_copies();
        }
        Ok(())
    }

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>> {
        let mut state = lock(&self.state);
        let id = state.allocate_id();
        let initial = if signaled { MockFenceState::Signaled } else { MockFenceState::Unsignaled };
        state.fences.insert(id, initial);
        state.events.push(MockEvent::CreateFence { id, signaled });
        Ok(Box::new(MockFence { id, state: self.state.clone() }))
    }

    fn create_semaphore(&self) -> Result<Box<dyn Semaphore>> {
        let mut state = lock(&self.state);
        let id = state.allocate_id();
        state.semaphores.insert(id, false);
        state.events.push(MockEvent::CreateSemaphore { id });
        Ok(Box::new(MockSemaphore { id, state: self.state.clone() }))
    }

    fn allocate_command_buffers(&self, count: usize) -> Result<Vec<Box<dyn CommandBuffer>>> {
        let mut state = lock(&self.state);
        let ids: Vec<ObjectId> = (0..count).map(|_| state.allocate_id()).collect();
        for &id in &ids {
            state.command_buffers.insert(id, CommandBufferRecord::default());
            state.events.push(MockEvent::AllocateCommandBuffer { id });
        }
        drop(state);

        Ok(ids
            .into_iter()
            .map(|id| {
                Box::new(MockCommandBuffer {
                    id,
                    commands: Vec::new(),
                    state: self.state.clone(),
                }) as Box<dyn CommandBuffer>
            })
            .collect())
    }

    fn submit(&self, submission: &Submission<'_>) -> Result<()> {
        let command_buffer = command_buffer_id(submission.command_buffer)?;
        let wait_semaphore = semaphore_id(submission.wait_semaphore)?;
        let signal_semaphore = semaphore_id(submission.signal_semaphore)?;
        let fence = fence_id(submission.fence)?;

        let mut state = lock(&self.state);
        if state.fail_submit {
            return Err(Error::FrameFailed("mock submit failure".to_string()));
        }

        let id = state.submissions.len() as u64;
        match state.fences.get(&fence).copied() {
            Some(MockFenceState::Unsignaled) => {}
            Some(MockFenceState::Signaled) => {
                state.violation(format!("submission {} uses fence {} that was not reset", id, fence));
            }
            Some(MockFenceState::Pending(other)) => {
                state.violation(format!(
                    "submission {} uses fence {} still pending on submission {}",
                    id, fence, other
                ));
            }
            None => state.violation(format!("submission {} uses unknown fence {}", id, fence)),
        }

        let dangling: Vec<ObjectId> = state
            .command_buffers
            .get(&command_buffer)
            .map(|r| {
                r.referenced_objects
                    .iter()
                    .copied()
                    .filter(|o| state.destroyed_objects.contains(o))
                    .collect()
            })
            .unwrap_or_default();
        for object in dangling {
            state.violation(format!(
                "command buffer {} submitted while it references destroyed object {}",
                command_buffer, object
            ));
        }

        let record = state.command_buffers.get(&command_buffer).map(|r| (r.executable, r.in_flight));
        match record {
            Some((false, _)) => {
                state.violation(format!("command buffer {} submitted before recording ended", command_buffer));
            }
            Some((true, Some(other))) => {
                state.violation(format!(
                    "command buffer {} submitted while still executing submission {}",
                    command_buffer, other
                ));
            }
            Some((true, None)) => {}
            None => state.violation(format!("unknown command buffer {}", command_buffer)),
        }

        state.consume_semaphore(wait_semaphore, "submit");
        state.signal_semaphore(signal_semaphore, "submit");

        state.submissions.push(SubmissionRecord { command_buffer, fence, complete: false });
        if let Some(record) = state.command_buffers.get_mut(&command_buffer) {
            record.in_flight = Some(id);
        }
        state.fences.insert(fence, MockFenceState::Pending(id));
        state.events.push(MockEvent::Submit {
            submission: id,
            command_buffer,
            wait_semaphore,
            signal_semaphore,
            fence,
        });
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        let mut state = lock(&self.state);
        state.events.push(MockEvent::DeviceWaitIdle);
        state.complete_copies();
        state.complete_all_submissions();
        Ok(())
    }
}

// ============================================================================
// MOCK BUFFER
// ============================================================================

pub struct MockBuffer {
    pub id: ObjectId,
    size: u64,
    usage: BufferUsage,
    location: MemoryLocation,
    state: SharedState,
}

impl Buffer for MockBuffer {
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
        if self.location == MemoryLocation::DeviceLocal {
            return Err(Error::BackendError("Buffer is not CPU-accessible".to_string()));
        }
        if offset + data.len() as u64 > self.size {
            return Err(Error::InvalidResource("write out of bounds".to_string()));
        }
        let mut state = lock(&self.state);
        if let Some(record) = state.buffers.get_mut(&self.id) {
            let start = offset as usize;
            record.data[start..start + data.len()].copy_from_slice(data);
        }
        state.events.push(MockEvent::WriteBuffer { id: self.id, offset, len: data.len() as u64 });
        Ok(())
    }

    fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        if self.location == MemoryLocation::DeviceLocal {
            return Err(Error::BackendError("Buffer is not CPU-accessible".to_string()));
        }
        if offset + len > self.size {
            return Err(Error::InvalidResource("read out of bounds".to_string()));
        }
        let state = lock(&self.state);
        let record = state
            .buffers
            .get(&self.id)
            .ok_or_else(|| Error::InvalidResource("buffer record missing".to_string()))?;
        Ok(record.data[offset as usize..(offset + len) as usize].to_vec())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockBuffer {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        let id = self.id;

        if state.pending_copies.iter().any(|c| c.src == id || c.dst == id) {
            state.violation(format!("buffer {} destroyed while a transfer still references it", id));
        }
        let in_use = state.command_buffers.iter().any(|(_, record)| {
            record.in_flight.is_some() && record.referenced_buffers.contains(&id)
        });
        if in_use {
            state.violation(format!("buffer {} destroyed while an in-flight command buffer references it", id));
        }

        // Memory goes away with the buffer; a late copy sees nothing
        state.pending_copies.retain(|c| c.src != id && c.dst != id);
        state.buffers.remove(&id);
        state.events.push(MockEvent::DestroyBuffer { id });
    }
}

// ============================================================================
// MOCK SYNC OBJECTS
// ============================================================================

pub struct MockFence {
    pub id: ObjectId,
    state: SharedState,
}

impl Fence for MockFence {
    fn wait(&self) -> Result<()> {
        let mut state = lock(&self.state);
        match state.fences.get(&self.id).copied() {
            Some(MockFenceState::Signaled) => {
                state.events.push(MockEvent::WaitFence { id: self.id, completed: None });
                Ok(())
            }
            Some(MockFenceState::Pending(submission)) => {
                state.complete_submission(submission);
                state.events.push(MockEvent::WaitFence { id: self.id, completed: Some(submission) });
                Ok(())
            }
            _ => {
                state.violation(format!("wait on fence {} would never return", self.id));
                Err(Error::FrameFailed(format!("fence {} is unsignaled with no pending work", self.id)))
            }
        }
    }

    fn reset(&self) -> Result<()> {
        let mut state = lock(&self.state);
        if let Some(MockFenceState::Pending(submission)) = state.fences.get(&self.id).copied() {
            state.violation(format!("fence {} reset while submission {} is pending", self.id, submission));
        }
        state.fences.insert(self.id, MockFenceState::Unsignaled);
        state.events.push(MockEvent::ResetFence { id: self.id });
        Ok(())
    }

    fn is_signaled(&self) -> Result<bool> {
        Ok(lock(&self.state).fences.get(&self.id) == Some(&MockFenceState::Signaled))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockFence {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        if let Some(MockFenceState::Pending(_)) = state.fences.get(&self.id) {
            state.violation(format!("fence {} destroyed while pending", self.id));
        }
        state.fences.remove(&self.id);
        state.events.push(MockEvent::DestroyFence { id: self.id });
    }
}

pub struct MockSemaphore {
    pub id: ObjectId,
    state: SharedState,
}

impl Semaphore for MockSemaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockSemaphore {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.check_no_pending_work("semaphore");
        state.semaphores.remove(&self.id);
        state.events.push(MockEvent::DestroySemaphore { id: self.id });
    }
}

// ============================================================================
// MOCK COMMAND BUFFER
// ============================================================================

pub struct MockCommandBuffer {
    pub id: ObjectId,
    pub commands: Vec<RecordedCommand>,
    state: SharedState,
}

impl MockCommandBuffer {
    fn push(&mut self, command: RecordedCommand) -> Result<()> {
        self.commands.push(command);
        Ok(())
    }
}

impl CommandBuffer for MockCommandBuffer {
    fn begin(&mut self, usage: CommandBufferUsage) -> Result<()> {
        {
            let mut state = lock(&self.state);
            if let Some(record) = state.command_buffers.get_mut(&self.id) {
                record.executable = false;
                record.referenced_buffers.clear();
                record.referenced_objects.clear();
            }
        }
        self.commands.clear();
        self.push(RecordedCommand::Begin { usage })
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &dyn RenderPass,
        framebuffer: &dyn Framebuffer,
        clear_color: [f32; 4],
    ) -> Result<()> {
        let render_pass_id = render_pass
            .as_any()
            .downcast_ref::<MockRenderPass>()
            .map(|r| r.id)
            .ok_or_else(|| Error::InvalidResource("not a mock render pass".to_string()))?;
        let framebuffer_id = framebuffer
            .as_any()
            .downcast_ref::<MockFramebuffer>()
            .map(|f| f.id)
            .ok_or_else(|| Error::InvalidResource("not a mock framebuffer".to_string()))?;
        {
            let mut state = lock(&self.state);
            state.reference_object(self.id, render_pass_id);
            state.reference_object(self.id, framebuffer_id);
        }
        self.push(RecordedCommand::BeginRenderPass {
            render_pass: render_pass_id,
            framebuffer: framebuffer_id,
            extent: (framebuffer.width(), framebuffer.height()),
            clear_color,
        })
    }

    fn bind_pipeline(&mut self, pipeline: &dyn Pipeline) -> Result<()> {
        let pipeline_id = pipeline
            .as_any()
            .downcast_ref::<MockPipeline>()
            .map(|p| p.id)
            .ok_or_else(|| Error::InvalidResource("not a mock pipeline".to_string()))?;
        lock(&self.state).reference_object(self.id, pipeline_id);
        self.push(RecordedCommand::BindPipeline { pipeline: pipeline_id })
    }

    fn bind_vertex_buffer(&mut self, buffer: &dyn Buffer, binding: u32, offset: u64) -> Result<()> {
        let id = buffer_id(buffer)?;
        if let Some(record) = lock(&self.state).command_buffers.get_mut(&self.id) {
            record.referenced_buffers.push(id);
        }
        self.push(RecordedCommand::BindVertexBuffer { buffer: id, binding, offset })
    }

    fn bind_index_buffer(&mut self, buffer: &dyn Buffer, offset: u64, index_type: IndexType) -> Result<()> {
        let id = buffer_id(buffer)?;
        if let Some(record) = lock(&self.state).command_buffers.get_mut(&self.id) {
            record.referenced_buffers.push(id);
        }
        self.push(RecordedCommand::BindIndexBuffer { buffer: id, offset, index_type })
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()> {
        self.push(RecordedCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        })
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.push(RecordedCommand::EndRenderPass)
    }

    fn end(&mut self) -> Result<()> {
        if let Some(record) = lock(&self.state).command_buffers.get_mut(&self.id) {
            record.executable = true;
        }
        self.push(RecordedCommand::End)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockCommandBuffer {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        let in_flight = state.command_buffers.get(&self.id).and_then(|r| r.in_flight);
        if let Some(submission) = in_flight {
            state.violation(format!("command buffer {} freed while submission {} is executing", self.id, submission));
        }
        state.command_buffers.remove(&self.id);
        state.events.push(MockEvent::FreeCommandBuffer { id: self.id });
    }
}

// ============================================================================
// MOCK SWAPCHAIN
// ============================================================================

pub struct MockSwapchain {
    pub id: ObjectId,
    state: SharedState,
    image_count: u32,
    extent: (u32, u32),
    acquire_order: Vec<u32>,
    acquire_calls: usize,
    held: Vec<bool>,
    out_of_date_at: Option<usize>,
    suboptimal_at: Option<usize>,
    present_calls: usize,
}

impl MockSwapchain {
    /// Hand out images in this order (repeating) instead of round-robin
    pub fn with_acquire_order(mut self, order: Vec<u32>) -> Self {
        self.acquire_order = order;
        self
    }

    /// Make the `n`th acquisition (0-based) report an out-of-date surface
    pub fn with_out_of_date_at(mut self, n: usize) -> Self {
        self.out_of_date_at = Some(n);
        self
    }

    /// Make the `n`th presentation (0-based) report a suboptimal swapchain
    pub fn with_suboptimal_at(mut self, n: usize) -> Self {
        self.suboptimal_at = Some(n);
        self
    }
}

impl Swapchain for MockSwapchain {
    fn image_count(&self) -> usize {
        self.image_count as usize
    }

    fn extent(&self) -> (u32, u32) {
        self.extent
    }

    fn acquire_next_image(&mut self, signal: &dyn Semaphore) -> Result<ImageIndex> {
        let call = self.acquire_calls;
        self.acquire_calls += 1;
        if self.out_of_date_at == Some(call) {
            return Err(Error::SwapchainOutOfDate);
        }

        let image = if self.acquire_order.is_empty() {
            (call % self.image_count as usize) as u32
        } else {
            self.acquire_order[call % self.acquire_order.len()]
        };
        let semaphore = semaphore_id(signal)?;

        let mut state = lock(&self.state);
        if self.held[image as usize] {
            state.violation(format!("image {} acquired again before being presented", image));
        }
        self.held[image as usize] = true;
        state.signal_semaphore(semaphore, "acquire");
        state.events.push(MockEvent::Acquire { image, semaphore });
        Ok(ImageIndex::new(image))
    }

    fn present(&mut self, image: ImageIndex, wait: &dyn Semaphore) -> Result<PresentOutcome> {
        let call = self.present_calls;
        self.present_calls += 1;
        let semaphore = semaphore_id(wait)?;

        let mut state = lock(&self.state);
        if !self.held.get(image.as_usize()).copied().unwrap_or(false) {
            state.violation(format!("{} presented without being acquired", image));
        } else {
            self.held[image.as_usize()] = false;
        }
        state.consume_semaphore(semaphore, "present");
        state.events.push(MockEvent::Present { image: image.get(), semaphore });

        if self.suboptimal_at == Some(call) {
            Ok(PresentOutcome::Suboptimal)
        } else {
            Ok(PresentOutcome::Optimal)
        }
    }
}

impl Drop for MockSwapchain {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.check_no_pending_work("swapchain");
        state.events.push(MockEvent::DestroySwapchain { id: self.id });
    }
}

// ============================================================================
// MOCK RENDER PASS / PIPELINE / FRAMEBUFFER
// ============================================================================

pub struct MockRenderPass {
    pub id: ObjectId,
    state: SharedState,
}

impl RenderPass for MockRenderPass {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockRenderPass {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.destroy_object("render pass", self.id);
        state.events.push(MockEvent::DestroyRenderPass { id: self.id });
    }
}

pub struct MockPipeline {
    pub id: ObjectId,
    state: SharedState,
}

impl Pipeline for MockPipeline {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockPipeline {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.destroy_object("pipeline", self.id);
        state.events.push(MockEvent::DestroyPipeline { id: self.id });
    }
}

pub struct MockFramebuffer {
    pub id: ObjectId,
    width: u32,
    height: u32,
    state: SharedState,
}

impl Framebuffer for MockFramebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockFramebuffer {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.destroy_object("framebuffer", self.id);
        state.events.push(MockEvent::DestroyFramebuffer { id: self.id });
    }
}

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Id of a mock fence behind a trait object
pub fn mock_fence_id(fence: &dyn Fence) -> ObjectId {
    fence_id(fence).unwrap()
}

/// Id of a mock semaphore behind a trait object
pub fn mock_semaphore_id(semaphore: &dyn Semaphore) -> ObjectId {
    semaphore_id(semaphore).unwrap()
}

/// Id of a mock buffer behind a trait object
pub fn mock_buffer_id(buffer: &dyn Buffer) -> ObjectId {
    buffer_id(buffer).unwrap()
}

/// Id of a mock command buffer behind a trait object
pub fn mock_command_buffer_id(command_buffer: &dyn CommandBuffer) -> ObjectId {
    command_buffer_id(command_buffer).unwrap()
}

/// Commands recorded into a mock command buffer behind a trait object
pub fn recorded_commands(command_buffer: &dyn CommandBuffer) -> Vec<RecordedCommand> {
    command_buffer
        .as_any()
        .downcast_ref::<MockCommandBuffer>()
        .map(|c| c.commands.clone())
        .unwrap()
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
