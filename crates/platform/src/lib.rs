//! Platform layer: windowing, input and the threads around the render loop.
//!
//! - The winit event-loop thread owns the GPU; all wgpu work happens there.
//! - Asset import and the orientation feed run on their own threads and talk
//!   back through [`HostEvent`]s sent on the event loop proxy.
//! - Gestures and orientation samples alike go through the `ViewportController`
//!   before being published to the render loop.
//! - No busy loop: a frame is requested only when the viewport is dirty.

use std::{path::PathBuf, sync::Arc, thread};

use anyhow::{Context, Result};
use asset::{ImportedModel, MemorySource};
use corelib::{Orientation, ViewportController, ViewportEvent, ViewportShared};
use renderer::{RenderLoop, SurfaceOptions};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

pub mod feed;
pub mod gesture;

pub use feed::FeedMode;

use gesture::PointerTracker;

const BUILTIN_OBJ: &str = include_str!("../assets/cube.obj");
const BUILTIN_MTL: &str = include_str!("../assets/cube.mtl");

/// Everything the host needs, resolved from the command line by the app.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// `None` shows the built-in model.
    pub model_path: Option<PathBuf>,
    pub feed: FeedMode,
    pub surface: SurfaceOptions,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Clipview".into(),
            width: 1280,
            height: 720,
            model_path: None,
            feed: FeedMode::default(),
            surface: SurfaceOptions::default(),
        }
    }
}

/// Messages from worker threads to the event loop.
#[derive(Debug)]
pub enum HostEvent {
    /// Orientation feed sample.
    Orientation(Orientation),
    ModelImported(Arc<ImportedModel>),
    ImportFailed(String),
}

/// Open the window and run until it is closed.
pub fn run_viewer(config: ViewerConfig) -> Result<()> {
    let event_loop = EventLoop::<HostEvent>::with_user_event()
        .build()
        .context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let shared = Arc::new(ViewportShared::new());
    let proxy = event_loop.create_proxy();

    spawn_import(config.model_path.clone(), proxy.clone())?;
    let feed_proxy = proxy.clone();
    let _feed = feed::spawn_feed(config.feed, move |sample| {
        feed_proxy.send_event(HostEvent::Orientation(sample)).is_ok()
    })?;

    let mut app = ViewerApp::new(config, shared);
    event_loop
        .run_app(&mut app)
        .map_err(|e| anyhow::anyhow!("Event loop error: {e:?}"))?;

    app.fatal.map_or(Ok(()), Err)
}

/// Feed `event` to the controller and publish its state when the view changed.
fn apply_event(
    controller: &mut ViewportController,
    shared: &ViewportShared,
    event: ViewportEvent,
) -> bool {
    if !controller.apply(event) {
        return false;
    }
    shared.publish(controller.transform());
    true
}

/// Import on a worker thread; the result is uploaded later on the GPU thread.
fn spawn_import(path: Option<PathBuf>, proxy: EventLoopProxy<HostEvent>) -> Result<()> {
    thread::Builder::new()
        .name("asset-import".into())
        .spawn(move || {
            let result = match &path {
                Some(path) => {
                    log::info!("Importing {}", path.display());
                    asset::import_model_from_path(path)
                }
                None => {
                    log::info!("No model given, using built-in model");
                    let src = MemorySource::new()
                        .with("cube.obj", BUILTIN_OBJ)
                        .with("cube.mtl", BUILTIN_MTL);
                    asset::import_model(&src, "cube.obj")
                }
            };
            let event = match result {
                Ok(model) => HostEvent::ModelImported(Arc::new(model)),
                Err(e) => HostEvent::ImportFailed(format!("{e:#}")),
            };
            if proxy.send_event(event).is_err() {
                log::debug!("Event loop closed before import finished");
            }
        })
        .context("Failed to spawn import thread")?;
    Ok(())
}

struct ViewerApp {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    render: RenderLoop,
    controller: ViewportController,
    pointer: PointerTracker,
    fatal: Option<anyhow::Error>,
}

impl ViewerApp {
    fn new(config: ViewerConfig, shared: Arc<ViewportShared>) -> Self {
        let render = RenderLoop::new(shared, config.surface);
        Self {
            config,
            window: None,
            render,
            controller: ViewportController::new(),
            pointer: PointerTracker::default(),
            fatal: None,
        }
    }

    fn request_redraw_if_dirty(&self) {
        if let Some(window) = &self.window {
            if self.render.shared().is_dirty() {
                window.request_redraw();
            }
        }
    }

    fn gesture(&mut self, event: Option<ViewportEvent>) {
        let Some(event) = event else { return };
        if apply_event(&mut self.controller, self.render.shared(), event) {
            self.request_redraw_if_dirty();
        }
    }

    fn view_size(&self) -> (u32, u32) {
        self.window
            .as_ref()
            .map(|w| {
                let size = w.inner_size();
                (size.width, size.height)
            })
            .unwrap_or((0, 0))
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.fatal = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler<HostEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let window = if let Some(window) = self.window.clone() {
            window
        } else {
            let attrs = Window::default_attributes()
                .with_title(self.config.title.clone())
                .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
            match event_loop.create_window(attrs) {
                Ok(window) => {
                    let window = Arc::new(window);
                    log::info!(
                        "Window created: {}x{}",
                        window.inner_size().width,
                        window.inner_size().height
                    );
                    self.window = Some(window.clone());
                    window
                }
                Err(e) => {
                    self.fail(event_loop, anyhow::Error::new(e).context("Failed to create window"));
                    return;
                }
            }
        };

        if let Err(e) = self.render.on_surface_ready(window.clone()) {
            self.fail(event_loop, anyhow::Error::new(e).context("GPU init failed"));
            return;
        }
        window.request_redraw();
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        self.render.on_surface_lost();
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: HostEvent) {
        match event {
            HostEvent::Orientation(sample) => {
                self.gesture(Some(ViewportEvent::Orientation(sample)));
            }
            HostEvent::ModelImported(model) => {
                self.render.set_model(model);
            }
            HostEvent::ImportFailed(err) => {
                log::error!("Model import failed, viewport stays empty: {err}");
            }
        }
        self.request_redraw_if_dirty();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                log::debug!("Resized: {}x{}", size.width, size.height);
                self.render.on_surface_resize(size.width, size.height);
                self.request_redraw_if_dirty();
            }
            WindowEvent::RedrawRequested => match self.render.on_frame() {
                Ok(_) => self.request_redraw_if_dirty(),
                Err(e) => self.fail(event_loop, anyhow::Error::new(e).context("Render failed")),
            },

            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let ev = match state {
                    ElementState::Pressed => self.pointer.press(),
                    ElementState::Released => self.pointer.release(),
                };
                self.gesture(ev);
            }
            WindowEvent::CursorMoved { position, .. } => {
                let (w, h) = self.view_size();
                let ev = self.pointer.moved(position, w, h);
                self.gesture(ev);
            }
            WindowEvent::CursorLeft { .. } => {
                let ev = self.pointer.leave();
                self.gesture(ev);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                // a wheel tick is a whole pinch; don't let it cut an active drag
                if self.controller.mode() == corelib::GestureMode::Idle {
                    self.gesture(Some(ViewportEvent::PinchBegin));
                    self.gesture(Some(ViewportEvent::PinchUpdate {
                        scale_ratio: gesture::wheel_ratio(delta),
                    }));
                    self.gesture(Some(ViewportEvent::PinchEnd));
                }
            }
            WindowEvent::PinchGesture { delta, phase, .. } => {
                for ev in gesture::pinch_events(delta, phase) {
                    self.gesture(Some(ev));
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                match event.logical_key {
                    Key::Named(NamedKey::Escape) => event_loop.exit(),
                    Key::Character(c) if c.as_str().eq_ignore_ascii_case("r") => {
                        self.gesture(Some(ViewportEvent::Reset));
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.render.on_surface_lost();
        log::info!("Viewer shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_model_imports_with_both_materials() {
        let src = MemorySource::new()
            .with("cube.obj", BUILTIN_OBJ)
            .with("cube.mtl", BUILTIN_MTL);
        let model = asset::import_model(&src, "cube.obj").unwrap();
        assert_eq!(model.mesh.triangle_count(), 12);
        assert_eq!(model.mesh.groups.len(), 2);
        assert_eq!(model.materials.len(), 2);
        assert_eq!(model.group_materials[0].material.name, "top");
    }

    #[test]
    fn feed_samples_reach_the_render_side_through_the_controller() {
        let shared = ViewportShared::new();
        let mut controller = ViewportController::new();
        shared.take_dirty();

        let sample = Orientation::new(5.0, -10.0, 45.0);
        assert!(apply_event(&mut controller, &shared, ViewportEvent::Orientation(sample)));
        assert!(shared.take_dirty());
        assert_eq!(controller.orientation(), sample);
        assert_eq!(shared.snapshot(), controller.transform());

        // repeated sample changes nothing and requests no frame
        assert!(!apply_event(&mut controller, &shared, ViewportEvent::Orientation(sample)));
        assert!(!shared.is_dirty());
    }

    #[test]
    fn gestures_and_orientation_publish_one_state() {
        let shared = ViewportShared::new();
        let mut controller = ViewportController::new();
        let sample = Orientation::new(1.0, 2.0, 3.0);

        apply_event(&mut controller, &shared, ViewportEvent::Orientation(sample));
        apply_event(&mut controller, &shared, ViewportEvent::PinchBegin);
        apply_event(&mut controller, &shared, ViewportEvent::PinchUpdate { scale_ratio: 2.0 });
        apply_event(&mut controller, &shared, ViewportEvent::PinchEnd);

        let snap = shared.snapshot();
        assert_eq!(snap.orientation, sample);
        assert_eq!(snap.gesture.scale, 2.0);

        // reset clears the gesture only
        apply_event(&mut controller, &shared, ViewportEvent::Reset);
        let snap = shared.snapshot();
        assert_eq!(snap.orientation, sample);
        assert_eq!(snap.gesture.scale, 1.0);
    }

    #[test]
    fn default_config_uses_builtin_model_and_stdin_feed() {
        let cfg = ViewerConfig::default();
        assert!(cfg.model_path.is_none());
        assert_eq!(cfg.feed, FeedMode::Stdin);
        assert!(cfg.surface.fit_model);
    }
}
