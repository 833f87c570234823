/// Renderer configuration

use std::path::PathBuf;

use crate::frame_cycle::MAX_FRAMES_IN_FLIGHT;

/// Configuration consumed by the renderer and its backend
#[derive(Debug, Clone)]
pub struct Config {
    /// Application name reported to the graphics driver
    pub app_name: String,

    /// Window size in pixels (the surface is never resized)
    pub window_width: u32,
    pub window_height: u32,

    /// Enable `VK_LAYER_KHRONOS_validation` and route its messages to the engine logger
    pub enable_validation: bool,

    /// Clear color of the single color attachment (RGBA)
    pub clear_color: [f32; 4],

    /// Precompiled SPIR-V vertex shader
    pub vertex_shader_path: PathBuf,

    /// Precompiled SPIR-V fragment shader
    pub fragment_shader_path: PathBuf,
}

impl Config {
    /// Number of frame slots in the frame cycle
    pub fn frames_in_flight(&self) -> usize {
        MAX_FRAMES_IN_FLIGHT
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Frame Forge".to_string(),
            window_width: 800,
            window_height: 600,
            enable_validation: cfg!(debug_assertions),
            clear_color: [0.6, 0.65, 0.4, 1.0],
            vertex_shader_path: PathBuf::from("shaders/vert.spv"),
            fragment_shader_path: PathBuf::from("shaders/frag.spv"),
        }
    }
}
