//! Error types for Frame Forge
//!
//! This module defines the error type used throughout the engine, covering
//! initialization, resource upload and the per-frame cycle.

use std::fmt;

/// Result type for Frame Forge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Frame Forge errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Vulkan, mock device, etc.)
    BackendError(String),

    /// Out of GPU memory, or no suitable memory type
    OutOfMemory,

    /// Invalid resource (empty geometry, size mismatch, foreign backend object)
    InvalidResource(String),

    /// Initialization failed (instance, device, swapchain, pipeline, shaders)
    InitializationFailed(String),

    /// Unrecoverable failure while waiting, submitting or presenting a frame
    FrameFailed(String),

    /// The presentation surface changed and the swapchain no longer matches it
    SwapchainOutOfDate,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::FrameFailed(msg) => write!(f, "Frame failed: {}", msg),
            Error::SwapchainOutOfDate => write!(f, "Swapchain out of date"),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an error and build a `BackendError` from the same message
///
/// # Example
///
/// ```no_run
/// # use frame_forge::engine_err;
/// let err = engine_err!("frame_forge::vulkan", "Failed to create buffer: {}", 42);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::forge::Error::BackendError(message)
    }};
}

/// Log an error and return early with a `BackendError`
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

/// Log a warning and build an `InvalidResource` error from the same message
///
/// Used for caller mistakes (bad input) rather than backend failures.
#[macro_export]
macro_rules! engine_warn_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_warn!($source, "{}", message);
        $crate::forge::Error::InvalidResource(message)
    }};
}

/// Log a warning and return early with an `InvalidResource` error
#[macro_export]
macro_rules! engine_bail_warn {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_warn_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
