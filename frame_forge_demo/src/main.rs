//! Frame Forge demo: two colored quads in a fixed-size window
//!
//! Uploads the quads once, then draws one frame per redraw until the window
//! is closed. Any engine error prints a single diagnostic and exits non-zero.

use frame_forge::forge::log::{DefaultLogger, LogSeverity};
use frame_forge::forge::{Config, Engine, Error, GeometryDesc, Renderer, Vertex};
use frame_forge::{engine_error, engine_info};
use std::path::PathBuf;
use std::process::ExitCode;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

const RED: [f32; 3] = [1.0, 0.0, 0.0];
const GREEN: [f32; 3] = [0.0, 1.0, 0.0];
const BLUE: [f32; 3] = [0.0, 0.0, 1.0];
const YELLOW: [f32; 3] = [1.0, 1.0, 0.0];

/// Quad with one color per corner, drawn as two triangles
fn quad(corners: [[f32; 2]; 4]) -> GeometryDesc {
    let vertices = corners
        .iter()
        .zip([RED, GREEN, BLUE, YELLOW])
        .map(|(corner, color)| Vertex::new([corner[0], corner[1], 0.0], color))
        .collect();
    GeometryDesc::new(vertices, vec![0, 1, 2, 2, 3, 0])
}

fn scene() -> Vec<GeometryDesc> {
    vec![
        quad([[-0.1, -0.4], [-0.1, 0.4], [-0.9, 0.4], [-0.9, -0.4]]),
        quad([[0.9, -0.4], [0.9, 0.2], [0.1, 0.4], [0.1, -0.4]]),
    ]
}

fn demo_config() -> Config {
    let shaders = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("shaders");
    Config {
        app_name: "Frame Forge Demo".to_string(),
        vertex_shader_path: shaders.join("vert.spv"),
        fragment_shader_path: shaders.join("frag.spv"),
        ..Config::default()
    }
}

struct App {
    config: Config,
    /// Declared before the window: the surface must go first
    renderer: Option<Renderer>,
    window: Option<Window>,
    error: Option<Error>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            renderer: None,
            window: None,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Error> {
        let attributes = Window::default_attributes()
            .with_title(self.config.app_name.clone())
            .with_inner_size(PhysicalSize::new(self.config.window_width, self.config.window_height))
            .with_resizable(false);

        let window = event_loop
            .create_window(attributes)
            .map_err(|e| Error::InitializationFailed(format!("Failed to create window: {}", e)))?;

        let parts = frame_forge_renderer_vulkan::create_renderer_parts(&window, &self.config)?;
        let renderer = Renderer::new(parts, &scene(), &self.config)?;

        engine_info!("frame_forge::demo", "Initialization complete, entering main loop");
        self.renderer = Some(renderer);
        self.window = Some(window);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: Error) {
        self.stop(error);
        event_loop.exit();
    }

    /// Record the first fatal error and tear the renderer down so no frame follows it
    fn stop(&mut self, error: Error) {
        engine_error!("frame_forge::demo", "{}", error);
        if self.error.is_none() {
            self.error = Some(error);
        }
        if let Some(renderer) = self.renderer.take() {
            if let Err(e) = renderer.clean_up() {
                engine_error!("frame_forge::demo", "Teardown failed: {}", e);
            }
        }
    }

    fn wants_redraw(&self) -> bool {
        self.error.is_none() && self.renderer.is_some()
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() && self.error.is_none() {
            if let Err(e) = self.init(event_loop) {
                self.fail(event_loop, e);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                engine_info!("frame_forge::demo", "Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let drawn = match self.renderer.as_mut() {
                    Some(renderer) => renderer.draw().map(|_| ()),
                    None => Ok(()),
                };
                if let Err(e) = drawn {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if !self.wants_redraw() {
            return;
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = self.renderer.take() {
            if let Err(e) = renderer.clean_up() {
                engine_error!("frame_forge::demo", "Teardown failed: {}", e);
                if self.error.is_none() {
                    self.error = Some(e);
                }
            }
        }
        self.window = None;
    }
}

fn main() -> ExitCode {
    let min_severity = if cfg!(debug_assertions) {
        LogSeverity::Debug
    } else {
        LogSeverity::Info
    };
    Engine::set_logger(DefaultLogger::with_min_severity(min_severity));

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            eprintln!("frame_forge_demo: failed to create event loop: {}", e);
            return ExitCode::FAILURE;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(demo_config());
    if let Err(e) = event_loop.run_app(&mut app) {
        eprintln!("frame_forge_demo: event loop error: {}", e);
        return ExitCode::FAILURE;
    }

    match app.error {
        Some(e) => {
            eprintln!("frame_forge_demo: {}", e);
            ExitCode::FAILURE
        }
        None => ExitCode::SUCCESS,
    }
}
