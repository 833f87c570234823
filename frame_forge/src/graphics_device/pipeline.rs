/// Render pass and graphics pipeline traits
///
/// Both are built by the backend during setup and only referenced
/// during recording.

use std::any::Any;

/// Render pass with a single color attachment
pub trait RenderPass: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// Graphics pipeline compatible with a render pass
pub trait Pipeline: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}
