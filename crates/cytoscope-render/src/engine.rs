//! The GPU device, queue and presentation target.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cytoscope_core::{DisplayMetrics, Viewport};

use crate::error::{RenderError, RenderResult};
use crate::readback;

/// Color format of the offscreen target used by headless engines.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Backends the engine asks the instance for.
///
/// GL is left out: it binds a 3D storage view as a single layer, so a
/// compute step would only write slice z = 0 of the field.
pub const REQUESTED_BACKENDS: wgpu::Backends = wgpu::Backends::PRIMARY;

/// Rejects adapters whose backend cannot run the field simulation.
pub fn check_backend(backend: wgpu::Backend) -> RenderResult<()> {
    match backend {
        wgpu::Backend::Gl => Err(RenderError::UnsupportedBackend(backend)),
        _ => Ok(()),
    }
}

/// What to do after the surface refused to hand out an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireAction {
    /// Reconfigure the surface, then skip the frame.
    Reconfigure,
    /// Skip the frame and try again on the next one.
    Skip,
    /// Stop rendering.
    Fail,
}

/// Maps a surface acquire error onto the frame loop's response.
#[must_use]
pub fn classify_acquire_error(error: &wgpu::SurfaceError) -> AcquireAction {
    match error {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => AcquireAction::Reconfigure,
        wgpu::SurfaceError::OutOfMemory => AcquireAction::Fail,
        _ => AcquireAction::Skip,
    }
}

/// Set from the device-lost callback; polled once per frame by the owner.
///
/// Device loss is reported only through this flag, never through per-call
/// errors, since every resource on the device must be rebuilt afterwards.
#[derive(Debug, Clone, Default)]
pub struct DeviceLostFlag(Arc<AtomicBool>);

impl DeviceLostFlag {
    /// Returns true once the device has been lost.
    #[must_use]
    pub fn is_lost(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Handles a device-lost notification. Dropping the device reports
    /// `Destroyed`, which is not a loss.
    fn report(&self, reason: wgpu::DeviceLostReason, message: &str) {
        if matches!(reason, wgpu::DeviceLostReason::Destroyed) {
            log::debug!("GPU device destroyed: {message}");
            return;
        }
        log::error!("GPU device lost ({reason:?}): {message}");
        self.0.store(true, Ordering::Release);
    }
}

/// Offscreen color target for headless rendering.
struct OffscreenTarget {
    texture: wgpu::Texture,
}

impl OffscreenTarget {
    fn new(device: &wgpu::Device, viewport: Viewport) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen color target"),
            size: wgpu::Extent3d {
                width: viewport.width,
                height: viewport.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        Self { texture }
    }
}

/// A color image acquired for one frame.
pub struct AcquiredFrame {
    view: wgpu::TextureView,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl AcquiredFrame {
    /// View to render into.
    #[must_use]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Presents the image if it came from a surface.
    pub fn present(self) {
        if let Some(texture) = self.surface_texture {
            texture.present();
        }
    }
}

/// The rendering engine backed by wgpu.
pub struct RenderEngine {
    /// The wgpu instance.
    pub instance: wgpu::Instance,
    /// The wgpu adapter.
    pub adapter: wgpu::Adapter,
    /// The wgpu device.
    pub device: wgpu::Device,
    /// The wgpu queue. Simulation and render passes are submitted here, in
    /// program order.
    pub queue: wgpu::Queue,
    /// The render surface (None for headless).
    surface: Option<wgpu::Surface<'static>>,
    /// Surface configuration (format also used for headless).
    surface_config: wgpu::SurfaceConfiguration,
    /// Offscreen target (headless only).
    offscreen: Option<OffscreenTarget>,
    /// Current render-target size.
    viewport: Viewport,
    /// Raised when the device is lost.
    device_lost: DeviceLostFlag,
}

impl RenderEngine {
    /// Creates a render engine presenting to `window`.
    pub async fn new_windowed(window: Arc<winit::window::Window>) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: REQUESTED_BACKENDS,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;
        check_backend(adapter.get_info().backend)?;

        let (device, queue, device_lost) =
            Self::request_device(&adapter, "cytoscope device").await?;

        let size = window.inner_size();
        let viewport = Viewport::new(size.width, size.height);

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(RenderError::AdapterCreationFailed)?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: viewport.width,
            height: viewport.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        log::info!(
            "render engine on {} ({:?}), surface {:?} {}x{}",
            adapter.get_info().name,
            adapter.get_info().backend,
            surface_format,
            viewport.width,
            viewport.height
        );

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface: Some(surface),
            surface_config,
            offscreen: None,
            viewport,
            device_lost,
        })
    }

    /// Creates a headless render engine drawing into an offscreen texture.
    pub async fn new_headless(width: u32, height: u32) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: REQUESTED_BACKENDS,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;
        check_backend(adapter.get_info().backend)?;

        let (device, queue, device_lost) =
            Self::request_device(&adapter, "cytoscope device (headless)").await?;

        let viewport = Viewport::new(width, height);
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            format: OFFSCREEN_FORMAT,
            width: viewport.width,
            height: viewport.height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        let offscreen = OffscreenTarget::new(&device, viewport);

        log::info!(
            "headless render engine on {} ({:?}) {}x{}",
            adapter.get_info().name,
            adapter.get_info().backend,
            viewport.width,
            viewport.height
        );

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface: None,
            surface_config,
            offscreen: Some(offscreen),
            viewport,
            device_lost,
        })
    }

    async fn request_device(
        adapter: &wgpu::Adapter,
        label: &str,
    ) -> RenderResult<(wgpu::Device, wgpu::Queue, DeviceLostFlag)> {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(label),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;

        let device_lost = DeviceLostFlag::default();
        let flag = device_lost.clone();
        device.set_device_lost_callback(move |reason, message| flag.report(reason, &message));

        Ok((device, queue, device_lost))
    }

    /// Color format of the presented image.
    #[must_use]
    pub fn output_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    /// Current render-target size.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Returns true once the device has been lost.
    #[must_use]
    pub fn device_lost(&self) -> bool {
        self.device_lost.is_lost()
    }

    /// Resizes the render target to the display's physical size if it
    /// differs. Returns whether anything changed; repeated calls with the
    /// same display are no-ops.
    pub fn sync_to_display(&mut self, display: &DisplayMetrics) -> bool {
        if !self.viewport.sync(display) {
            return false;
        }
        self.apply_viewport();
        true
    }

    /// Resizes the render target to an explicit physical size.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        self.sync_to_display(&DisplayMetrics::from_physical(width, height))
    }

    fn apply_viewport(&mut self) {
        self.surface_config.width = self.viewport.width;
        self.surface_config.height = self.viewport.height;
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.surface_config);
        }
        if self.offscreen.is_some() {
            self.offscreen = Some(OffscreenTarget::new(&self.device, self.viewport));
        }
    }

    /// Acquires the image to draw this frame into.
    ///
    /// Transient surface failures return `Ok(None)` so the caller skips the
    /// frame and retries on the next one; a lost or outdated surface is
    /// reconfigured first.
    pub fn acquire_frame(&mut self) -> RenderResult<Option<AcquiredFrame>> {
        let Some(surface) = &self.surface else {
            let target = self.offscreen.as_ref().ok_or(RenderError::NoOffscreenTarget)?;
            return Ok(Some(AcquiredFrame {
                view: target
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default()),
                surface_texture: None,
            }));
        };

        match surface.get_current_texture() {
            Ok(texture) => {
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(Some(AcquiredFrame {
                    view,
                    surface_texture: Some(texture),
                }))
            }
            Err(err) => match classify_acquire_error(&err) {
                AcquireAction::Reconfigure => {
                    log::warn!("surface {err}; reconfiguring and skipping frame");
                    surface.configure(&self.device, &self.surface_config);
                    Ok(None)
                }
                AcquireAction::Skip => {
                    log::warn!("surface acquire failed ({err}); skipping frame");
                    Ok(None)
                }
                AcquireAction::Fail => Err(RenderError::OutOfMemory),
            },
        }
    }

    /// Reads the offscreen target back as tightly packed RGBA8 rows.
    pub fn read_offscreen(&self) -> RenderResult<Vec<u8>> {
        let target = self.offscreen.as_ref().ok_or(RenderError::NoOffscreenTarget)?;
        readback::read_texture_2d(
            &self.device,
            &self.queue,
            &target.texture,
            self.viewport.width,
            self.viewport.height,
            4,
        )
    }
}
