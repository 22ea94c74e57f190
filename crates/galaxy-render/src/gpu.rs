//! Device, queue and window surface.
//!
//! [`RenderContext`] is created once per window. When the window asks for
//! transparency the surface is configured with a non-opaque alpha mode, if
//! the platform offers one, so the frame's alpha reaches the desktop.

use std::sync::Arc;
use winit::window::Window;

#[derive(Debug, thiserror::Error)]
pub enum RenderContextError {
    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("surface reports no usable texture format")]
    NoSurfaceFormat,

    #[error("failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("failed to create surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
}

/// Why no surface texture could be acquired this frame.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    /// Still lost after one reconfigure.
    #[error("surface lost")]
    Lost,

    #[error("out of memory")]
    OutOfMemory,

    #[error("timeout")]
    Timeout,
}

/// Surface preferences taken from the window configuration.
#[derive(Clone, Copy, Debug)]
pub struct SurfacePreferences {
    pub vsync: bool,
    pub transparent: bool,
}

pub struct RenderContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub surface_format: wgpu::TextureFormat,
}

impl RenderContext {
    pub async fn new(
        window: Arc<Window>,
        prefs: SurfacePreferences,
    ) -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let inner = window.inner_size();
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderContextError::NoAdapter)?;
        let adapter_info = adapter.get_info();
        log::info!(
            "Using adapter {} on {:?} ({:?})",
            adapter_info.name,
            adapter_info.backend,
            adapter_info.device_type
        );

        let (device, queue) = request_device(&adapter).await?;

        let caps = surface.get_capabilities(&adapter);
        let surface_format =
            select_surface_format(&caps.formats).ok_or(RenderContextError::NoSurfaceFormat)?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: inner.width.max(1),
            height: inner.height.max(1),
            present_mode: select_present_mode(&caps.present_modes, prefs.vsync),
            alpha_mode: select_alpha_mode(&caps.alpha_modes, prefs.transparent),
            view_formats: Vec::new(),
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        log::info!(
            "Surface configured: {:?}, {:?}, alpha {:?}",
            surface_config.format,
            surface_config.present_mode,
            surface_config.alpha_mode
        );

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface,
            surface_config,
            surface_format,
        })
    }

    /// Reconfigure for a new window size. Zero edges become 1.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface_config.width = width.max(1);
        self.surface_config.height = height.max(1);
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Largest render target edge the device accepts.
    pub fn max_target_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    /// Acquire the next surface texture. A lost or outdated surface is
    /// reconfigured and retried once.
    pub fn get_current_texture(&self) -> Result<wgpu::SurfaceTexture, SurfaceError> {
        let first = self.surface.get_current_texture();
        let retry = matches!(
            first,
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated)
        );
        if retry {
            log::warn!("Surface lost or outdated, reconfiguring");
            self.surface.configure(&self.device, &self.surface_config);
            return self
                .surface
                .get_current_texture()
                .map_err(|_| SurfaceError::Lost);
        }
        first.map_err(|err| match err {
            wgpu::SurfaceError::OutOfMemory => SurfaceError::OutOfMemory,
            wgpu::SurfaceError::Timeout => SurfaceError::Timeout,
            other => {
                log::error!("Surface acquisition failed: {other}");
                SurfaceError::Lost
            }
        })
    }
}

async fn request_device(
    adapter: &wgpu::Adapter,
) -> Result<(wgpu::Device, wgpu::Queue), wgpu::RequestDeviceError> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("galaxy-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::Off,
        })
        .await
}

/// Block on [`RenderContext::new`] with `pollster`.
pub fn init_render_context_blocking(
    window: Arc<Window>,
    prefs: SurfacePreferences,
) -> Result<RenderContext, RenderContextError> {
    pollster::block_on(RenderContext::new(window, prefs))
}

/// sRGB BGRA, then sRGB RGBA, then any sRGB format, then whatever comes first.
fn select_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    const PREFERRED: [wgpu::TextureFormat; 2] = [
        wgpu::TextureFormat::Bgra8UnormSrgb,
        wgpu::TextureFormat::Rgba8UnormSrgb,
    ];
    PREFERRED
        .into_iter()
        .find(|f| formats.contains(f))
        .or_else(|| formats.iter().copied().find(|f| f.is_srgb()))
        .or_else(|| formats.first().copied())
}

fn select_present_mode(modes: &[wgpu::PresentMode], vsync: bool) -> wgpu::PresentMode {
    if vsync || !modes.contains(&wgpu::PresentMode::Mailbox) {
        wgpu::PresentMode::Fifo
    } else {
        wgpu::PresentMode::Mailbox
    }
}

/// Pick a compositing mode that keeps the frame's alpha when `transparent` is set.
fn select_alpha_mode(modes: &[wgpu::CompositeAlphaMode], transparent: bool) -> wgpu::CompositeAlphaMode {
    if transparent {
        for preferred in [
            wgpu::CompositeAlphaMode::PostMultiplied,
            wgpu::CompositeAlphaMode::PreMultiplied,
        ] {
            if modes.contains(&preferred) {
                return preferred;
            }
        }
        log::warn!("Transparent window requested but surface only supports {modes:?}");
    }
    modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}
