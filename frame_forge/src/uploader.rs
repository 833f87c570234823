//! Staged transfer uploader
//!
//! Device-local memory is not host-addressable on discrete GPUs, so bytes
//! reach it through a host-visible staging buffer and a one-shot copy:
//!
//! 1. create a staging buffer of exactly `bytes.len()` (host-visible, `TRANSFER_SRC`)
//! 2. write the bytes at offset 0
//! 3. create the destination (device-local, `TRANSFER_DST | usage`)
//! 4. copy the whole range and block until the queue is idle
//! 5. drop the staging buffer
//!
//! The staging buffer is a local owned value: it is released on every exit
//! path, and it is borrowed by the copy call, which only returns once the
//! transfer has completed. Freeing it early does not compile.

use crate::error::Result;
use crate::graphics_device::{Buffer, BufferCopy, BufferDesc, BufferUsage, GraphicsDevice, MemoryLocation};
use crate::{engine_bail_warn, engine_error, engine_trace};

/// What the uploaded bytes will be bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadUsage {
    VertexData,
    IndexData,
}

impl UploadUsage {
    /// Usage flags of the destination buffer
    pub fn buffer_usage(self) -> BufferUsage {
        match self {
            UploadUsage::VertexData => BufferUsage::TRANSFER_DST | BufferUsage::VERTEX,
            UploadUsage::IndexData => BufferUsage::TRANSFER_DST | BufferUsage::INDEX,
        }
    }

    fn buffer_name(self) -> &'static str {
        match self {
            UploadUsage::VertexData => "vertex_buffer",
            UploadUsage::IndexData => "index_buffer",
        }
    }
}

/// Copy `bytes` into a new device-local buffer
///
/// Blocks until the transfer has completed. Only meant for setup-time
/// uploads. Ownership of the returned buffer passes to the caller.
///
/// # Errors
///
/// - `InvalidResource` if `bytes` is empty
/// - any buffer creation, write or copy failure from the device
pub fn upload(device: &dyn GraphicsDevice, bytes: &[u8], usage: UploadUsage) -> Result<Box<dyn Buffer>> {
    if bytes.is_empty() {
        engine_bail_warn!("frame_forge::uploader", "Refusing to upload an empty {:?} buffer", usage);
    }
    let size = bytes.len() as u64;

    let staging = device
        .create_buffer(BufferDesc {
            name: "staging_buffer",
            size,
            usage: BufferUsage::TRANSFER_SRC,
            location: MemoryLocation::HostVisible,
        })
        .inspect_err(|e| engine_error!("frame_forge::uploader", "Failed to create staging buffer ({} bytes): {}", size, e))?;

    write_exact(staging.as_ref(), bytes)?;

    let destination = device
        .create_buffer(BufferDesc {
            name: usage.buffer_name(),
            size,
            usage: usage.buffer_usage(),
            location: MemoryLocation::DeviceLocal,
        })
        .inspect_err(|e| engine_error!("frame_forge::uploader", "Failed to create {:?} buffer ({} bytes): {}", usage, size, e))?;

    device
        .copy_buffer_blocking(staging.as_ref(), destination.as_ref(), BufferCopy::whole(size))
        .inspect_err(|e| engine_error!("frame_forge::uploader", "Staging copy failed: {}", e))?;

    engine_trace!("frame_forge::uploader", "Uploaded {} bytes of {:?}", size, usage);
    Ok(destination)
}

/// Copy a device-local buffer back to the CPU through a readback buffer
///
/// Debug path: uses the same blocking transfer as [`upload`].
pub fn read_back(device: &dyn GraphicsDevice, buffer: &dyn Buffer) -> Result<Vec<u8>> {
    let size = buffer.size();
    let readback = device.create_buffer(BufferDesc {
        name: "readback_buffer",
        size,
        usage: BufferUsage::TRANSFER_DST,
        location: MemoryLocation::Readback,
    })?;

    device.copy_buffer_blocking(buffer, readback.as_ref(), BufferCopy::whole(size))?;
    readback.read(0, size)
}

/// Write `bytes` so that they cover `buffer` exactly
fn write_exact(buffer: &dyn Buffer, bytes: &[u8]) -> Result<()> {
    if buffer.size() != bytes.len() as u64 {
        engine_bail_warn!(
            "frame_forge::uploader",
            "Staging size mismatch: buffer is {} bytes, data is {} bytes",
            buffer.size(),
            bytes.len()
        );
    }
    buffer.write(0, bytes)
}

#[cfg(test)]
#[path = "uploader_tests.rs"]
mod tests;
