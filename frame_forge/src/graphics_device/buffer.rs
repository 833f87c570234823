/// Buffer trait and buffer descriptors

use std::any::Any;

use crate::error::Result;

bitflags::bitflags! {
    /// How a buffer may be used by the device
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const TRANSFER_SRC = 0b0001;
        const TRANSFER_DST = 0b0010;
        const VERTEX       = 0b0100;
        const INDEX        = 0b1000;
    }
}

/// Where a buffer's memory lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryLocation {
    /// Host-visible and host-coherent, written by the CPU (staging)
    HostVisible,
    /// Device-local, not host-addressable on discrete GPUs
    DeviceLocal,
    /// Host-visible and cached, read by the CPU after a transfer
    Readback,
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    /// Debug name passed to the allocator
    pub name: &'static str,
    /// Size in bytes, must be non-zero
    pub size: u64,
    pub usage: BufferUsage,
    pub location: MemoryLocation,
}

/// A single buffer-to-buffer copy region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferCopy {
    pub src_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

impl BufferCopy {
    /// Copy `size` bytes from offset 0 to offset 0
    pub fn whole(size: u64) -> Self {
        Self { src_offset: 0, dst_offset: 0, size }
    }
}

/// GPU buffer owning its handle and memory allocation
///
/// Dropping the buffer destroys the handle and frees the memory.
pub trait Buffer: Send + Sync {
    /// Size in bytes
    fn size(&self) -> u64;

    fn usage(&self) -> BufferUsage;

    fn location(&self) -> MemoryLocation;

    /// Copy `data` into host-visible memory at `offset`
    fn write(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Read `len` bytes from host-visible memory at `offset`
    fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>>;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}
