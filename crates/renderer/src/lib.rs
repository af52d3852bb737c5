//! Renderer: wgpu surface/device + depth, and the per-frame model draw.
//! wgpu = 23.x, winit = 0.30.x

use std::sync::Arc;

use asset::ImportedModel;
use corelib::{ViewportShared, ViewportTransform, camera::Camera};
use wgpu::{
    CommandEncoderDescriptor, CompositeAlphaMode, Device, DeviceDescriptor, Extent3d, Features,
    Instance, InstanceDescriptor, Limits, LoadOp, Operations, PowerPreference, PresentMode, Queue,
    RenderPassColorAttachment, RenderPassDescriptor, StoreOp, Surface, SurfaceConfiguration,
    SurfaceError, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor,
};
use winit::{dpi::PhysicalSize, window::Window};

pub mod error;
pub mod model;
pub mod program;

pub use error::{RenderError, RenderResult};
pub use model::RenderableModel;
pub use program::RenderTargets;

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

/// Options fixed at surface creation.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceOptions {
    pub backends: wgpu::Backends,
    pub vsync: bool,
    /// Normalize the model into a unit sphere before the viewport transform.
    pub fit_model: bool,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            vsync: true,
            fit_model: true,
        }
    }
}

/// Surface, device and the currently uploaded model. Lives exactly as long as the surface.
pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Depth
    depth_view: TextureView,

    camera: Camera,
    model: Option<RenderableModel>,
    fit_model: bool,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>.
    pub async fn new(window: Arc<Window>, options: SurfaceOptions) -> RenderResult<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(InstanceDescriptor {
            backends: options.backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        log::info!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("Clipview Device"),
                    required_features: Features::empty(),
                    required_limits: Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: if options.vsync {
                PresentMode::AutoVsync
            } else {
                PresentMode::AutoNoVsync
            },
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        let depth_view = create_depth_view(&device, &surface_config);

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            depth_view,
            camera: Camera::viewer(Camera::aspect_for(width, height)),
            model: None,
            fit_model: options.fit_model,
        })
    }

    pub fn targets(&self) -> RenderTargets {
        RenderTargets {
            color: self.surface_config.format,
            depth: DEPTH_FORMAT,
        }
    }

    /// Upload `model`, replacing any previous one.
    pub fn install_model(&mut self, model: &ImportedModel) {
        let renderable = RenderableModel::new(&self.device, &self.queue, model, self.targets());
        log::info!(
            "Uploaded {} ({} indices, program valid: {})",
            model.name,
            renderable.index_count(),
            renderable.is_valid()
        );
        self.model = Some(renderable);
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Resize: reconfigure surface, recreate depth view, recompute projection.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface_config.width = width.max(1);
        self.surface_config.height = height.max(1);
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
        self.camera = self.camera.with_aspect(Camera::aspect_for(width, height));
    }

    pub fn size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    /// Render one frame: compose the MVP from `view`, clear, draw the model.
    pub fn render(&mut self, view: &ViewportTransform) -> Result<(), SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let target = frame.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(CLEAR_COLOR),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some(model) = &self.model {
                let mut mvp = view.mvp(&self.camera);
                if self.fit_model {
                    mvp *= model.fit_matrix();
                }
                model.draw(&self.queue, &mut rpass, mvp);
            }
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        let (w, h) = self.size();
        self.resize(w, h);
    }
}

/// Drives [`GpuState`] from host lifecycle hooks.
///
/// Owned by the GPU thread. The imported model is kept CPU-side so a lost
/// surface can be rebuilt without re-importing.
pub struct RenderLoop {
    shared: Arc<ViewportShared>,
    options: SurfaceOptions,
    gpu: Option<GpuState>,
    model: Option<Arc<ImportedModel>>,
    model_uploaded: bool,
}

impl RenderLoop {
    pub fn new(shared: Arc<ViewportShared>, options: SurfaceOptions) -> Self {
        Self {
            shared,
            options,
            gpu: None,
            model: None,
            model_uploaded: false,
        }
    }

    pub fn shared(&self) -> &Arc<ViewportShared> {
        &self.shared
    }

    pub fn is_ready(&self) -> bool {
        self.gpu.is_some()
    }

    /// Hand over an imported model. GPU upload happens on the next ready surface or frame.
    pub fn set_model(&mut self, model: Arc<ImportedModel>) {
        self.model = Some(model);
        self.model_uploaded = false;
        self.shared.mark_dirty();
    }

    /// Build device, surface and GPU resources for `window`.
    pub fn on_surface_ready(&mut self, window: Arc<Window>) -> RenderResult<()> {
        let gpu = pollster::block_on(GpuState::new(window, self.options))?;
        self.gpu = Some(gpu);
        self.model_uploaded = false;
        self.upload_pending();
        self.shared.mark_dirty();
        Ok(())
    }

    pub fn on_surface_resize(&mut self, width: u32, height: u32) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.resize(width, height);
            self.shared.mark_dirty();
        }
    }

    /// Render if anything changed since the last frame. Returns whether a frame was drawn.
    pub fn on_frame(&mut self) -> RenderResult<bool> {
        if self.gpu.is_none() || !self.shared.take_dirty() {
            return Ok(false);
        }
        self.upload_pending();
        let view = self.shared.snapshot();
        let Some(gpu) = self.gpu.as_mut() else {
            return Ok(false);
        };

        match gpu.render(&view) {
            Ok(()) => Ok(true),
            Err(e) if GpuState::is_surface_lost(&e) => {
                log::warn!("Surface {e:?}, reconfiguring");
                gpu.recreate_surface();
                self.shared.mark_dirty();
                Ok(false)
            }
            Err(SurfaceError::OutOfMemory) => Err(RenderError::OutOfMemory),
            Err(e) => {
                log::warn!("Frame skipped: {e:?}");
                self.shared.mark_dirty();
                Ok(false)
            }
        }
    }

    /// Release every GPU resource; the CPU-side model is kept.
    pub fn on_surface_lost(&mut self) {
        if self.gpu.take().is_some() {
            log::info!("Surface lost, GPU resources released");
        }
        self.model_uploaded = false;
    }

    fn upload_pending(&mut self) {
        if self.model_uploaded {
            return;
        }
        if let (Some(gpu), Some(model)) = (self.gpu.as_mut(), self.model.as_ref()) {
            gpu.install_model(model);
            self.model_uploaded = true;
        }
    }
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}
