// Bezier Patch Viewer
//
// Hosts the tessellation pipeline in a winit window backed by a CAMetalLayer.
//
// Controls:
// - Click and drag: orbit the camera
//
// Usage: cargo run --example patch_viewer [scene.toml]

use bezier_tess::patch_tess::camera::window_to_view_point;
use bezier_tess::patch_tess::{
    FrameOrchestrator, FrameResult, OrbitCamera, RenderTarget, SceneConfig, TargetAttachments,
    TargetFormat, TessError,
};
use cocoa::{appkit::NSView, base::id as cocoa_id};
use core_graphics_types::geometry::CGSize;
use metal::*;
use objc::{rc::autoreleasepool, runtime::YES};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    raw_window_handle::{HasWindowHandle, RawWindowHandle},
    window::{Window, WindowId},
};

struct Viewer {
    config: SceneConfig,
    window: Option<Window>,
    device: Option<Device>,
    layer: Option<MetalLayer>,
    orchestrator: Option<FrameOrchestrator>,
    attachments: Option<TargetAttachments>,
    camera: OrbitCamera,
    cursor: (f32, f32),
    dragging: bool,
}

impl Viewer {
    fn new(config: SceneConfig) -> Self {
        let camera = OrbitCamera::from_config(&config.camera);
        Self {
            config,
            window: None,
            device: None,
            layer: None,
            orchestrator: None,
            attachments: None,
            camera,
            cursor: (0.0, 0.0),
            dragging: false,
        }
    }

    fn initialize(&mut self, window: Window) -> Result<(), TessError> {
        let device = Device::system_default().ok_or(TessError::NoDevice)?;
        info!(gpu = %device.name(), "starting patch viewer");

        let format = TargetFormat::with_sample_count(self.config.target.sample_count);

        let layer = MetalLayer::new();
        layer.set_device(&device);
        layer.set_pixel_format(format.color);
        layer.set_presents_with_transaction(false);

        unsafe {
            if let Ok(handle) = window.window_handle() {
                if let RawWindowHandle::AppKit(appkit_handle) = handle.as_raw() {
                    let view = appkit_handle.ns_view.as_ptr() as cocoa_id;
                    view.setWantsLayer(YES);
                    view.setLayer(layer.as_ref() as *const _ as *mut _);
                }
            }
        }

        let size = window.inner_size();
        layer.set_drawable_size(CGSize::new(size.width as f64, size.height as f64));

        let orchestrator = FrameOrchestrator::new(&device, &self.config, format)?;
        let attachments =
            TargetAttachments::new(&device, format, size.width as u64, size.height as u64);

        self.window = Some(window);
        self.layer = Some(layer);
        self.orchestrator = Some(orchestrator);
        self.attachments = Some(attachments);
        self.device = Some(device);
        Ok(())
    }

    fn render(&mut self) {
        let (Some(device), Some(layer), Some(orchestrator), Some(attachments)) = (
            self.device.as_ref(),
            self.layer.as_ref(),
            self.orchestrator.as_mut(),
            self.attachments.as_mut(),
        ) else {
            return;
        };

        let camera_world = self.camera.world_transform();
        let drawable = layer.next_drawable();
        if let Some(d) = drawable {
            // The layer may hand out a drawable before the resize event lands
            let texture = d.texture();
            attachments.resize(device, texture.width(), texture.height());
        }
        let attachments: &TargetAttachments = attachments;
        let target = drawable.map(|d| RenderTarget::new(d, attachments));
        let drawable_size = target
            .as_ref()
            .map(|t| t.drawable_size())
            .unwrap_or((0.0, 0.0));

        if orchestrator.render_frame(&camera_world, drawable_size, target.as_ref())
            == FrameResult::Submitted
        {
            let stats = orchestrator.stats();
            if stats.submitted % 600 == 0 {
                info!(
                    submitted = stats.submitted,
                    dropped = stats.dropped,
                    azimuth = self.camera.azimuth(),
                    elevation = self.camera.elevation(),
                    "frame stats"
                );
            }
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Some(layer) = &self.layer {
            layer.set_drawable_size(CGSize::new(width as f64, height as f64));
        }
        if let (Some(device), Some(attachments)) = (&self.device, self.attachments.as_mut()) {
            attachments.resize(device, width as u64, height as u64);
        }
    }

    /// winit reports physical pixels with Y down; the camera expects points
    /// with Y up.
    fn to_local(&self, position: PhysicalPosition<f64>) -> (f32, f32) {
        let (scale, height) = self
            .window
            .as_ref()
            .map(|w| (w.scale_factor(), w.inner_size().height as f64))
            .unwrap_or((1.0, 0.0));
        window_to_view_point((position.x, position.y), scale, height)
    }

    fn handle_cursor_move(&mut self, position: PhysicalPosition<f64>) {
        self.cursor = self.to_local(position);
        if self.dragging {
            self.camera.drag(self.cursor.0, self.cursor.1);
        }
    }

    fn handle_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }
        match state {
            ElementState::Pressed => {
                self.dragging = true;
                self.camera.press(self.cursor.0, self.cursor.1);
            }
            ElementState::Released => {
                self.dragging = false;
                self.camera.release();
            }
        }
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let window_attrs = Window::default_attributes()
            .with_inner_size(winit::dpi::LogicalSize::new(1200, 800))
            .with_title("Cubic Bezier Patch Tessellation");

        let window = match event_loop.create_window(window_attrs) {
            Ok(w) => w,
            Err(e) => {
                error!("failed to create window: {e}");
                std::process::exit(1);
            }
        };

        if let Err(e) = self.initialize(window) {
            error!("setup failed: {e}");
            std::process::exit(1);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        autoreleasepool(|| match event {
            WindowEvent::CloseRequested => {
                if let Some(orchestrator) = &self.orchestrator {
                    let stats = orchestrator.stats();
                    info!(submitted = stats.submitted, dropped = stats.dropped, "viewer closed");
                }
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.resize(new_size.width.max(1), new_size.height.max(1));
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor_move(position);
            }
            WindowEvent::MouseInput { button, state, .. } => {
                self.handle_mouse_button(button, state);
            }
            WindowEvent::RedrawRequested => {
                self.render();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        });
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn load_config() -> SceneConfig {
    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        return SceneConfig::default();
    };
    match SceneConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config();

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            error!("failed to create event loop: {e}");
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut viewer = Viewer::new(config);
    if let Err(e) = event_loop.run_app(&mut viewer) {
        error!("event loop error: {e}");
    }
}
