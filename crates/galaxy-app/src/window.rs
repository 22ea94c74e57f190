//! Window creation and event handling via winit.
//!
//! [`GalaxyApp`] implements winit's [`ApplicationHandler`]. It owns the GPU
//! context and compositor, tracks the viewport and pointer, and hands every
//! redraw to the [`FrameDriver`].

use std::path::PathBuf;
use std::sync::Arc;

use galaxy_config::{CliArgs, Config};
use galaxy_render::{
    FrameOutcome, GpuCompositor, RenderContext, SurfacePreferences, SurfaceWrapper,
    init_render_context_blocking,
};
use glam::Vec2;
use tracing::{debug, error, info, instrument, warn};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::error::AppError;
use crate::frame_driver::{DriverError, FrameDriver};
use crate::scene;

/// Frames between periodic stats lines at `debug`.
const STATS_INTERVAL: u64 = 600;

/// Window attributes from the `window` config section.
pub fn window_attributes(config: &Config) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(config.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            config.window.width as f64,
            config.window.height as f64,
        ))
        .with_transparent(config.window.transparent)
}

pub struct GalaxyApp {
    config: Config,
    config_dir: PathBuf,
    cli: CliArgs,
    window: Option<Arc<Window>>,
    gpu: Option<RenderContext>,
    compositor: Option<GpuCompositor>,
    driver: FrameDriver,
    surface_wrapper: SurfaceWrapper,
    pointer: Option<Vec2>,
    error: Option<AppError>,
}

impl GalaxyApp {
    /// Generate the galaxy up front; the window and GPU come with `resumed`.
    pub fn new(config: Config, config_dir: PathBuf, cli: CliArgs) -> Result<Self, DriverError> {
        let (width, height) = (config.window.width, config.window.height);
        let driver = FrameDriver::from_config(&config, width, height)?;
        Ok(Self {
            config,
            config_dir,
            cli,
            window: None,
            gpu: None,
            compositor: None,
            driver,
            surface_wrapper: SurfaceWrapper::new(width, height, 1.0),
            pointer: None,
            error: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn driver(&self) -> &FrameDriver {
        &self.driver
    }

    /// Pointer in NDC, `None` while the cursor is outside the window.
    pub fn pointer(&self) -> Option<Vec2> {
        self.pointer
    }

    /// The error that stopped the event loop, if any.
    pub fn take_error(&mut self) -> Option<AppError> {
        self.error.take()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        error!("{err}");
        self.error = Some(err);
        event_loop.exit();
    }

    fn handle_resize(&mut self, width: u32, height: u32) {
        let Some(change) = self.surface_wrapper.handle_resize(width, height) else {
            return;
        };
        if let Some(gpu) = &mut self.gpu {
            gpu.resize(change.surface.width, change.surface.height);
        }
        self.driver
            .resize(change.viewport.width, change.viewport.height);
        if !self.surface_wrapper.is_renderable() {
            self.pointer = None;
        }
        info!(
            "Viewport resized to {}x{} (scale: {:.2})",
            change.viewport.width, change.viewport.height, change.scale_factor
        );
    }

    fn handle_cursor_moved(&mut self, x: f64, y: f64) {
        self.pointer = self.surface_wrapper.cursor_to_ndc(x, y);
    }

    fn handle_cursor_left(&mut self) {
        self.pointer = None;
    }

    /// Re-read `config.ron`, keep CLI overrides on top, and apply what changed.
    fn reload_config(&mut self) -> Result<bool, AppError> {
        let Some(mut config) = self.config.reload(&self.config_dir)? else {
            info!("Config unchanged");
            return Ok(false);
        };
        config.apply_cli_overrides(&self.cli);
        if config == self.config {
            info!("Config unchanged");
            return Ok(false);
        }
        self.apply_config(config)?;
        Ok(true)
    }

    fn apply_config(&mut self, config: Config) -> Result<(), AppError> {
        config.validate()?;

        let regenerate = config.galaxy != self.config.galaxy
            || config.stars != self.config.stars
            || config.haze != self.config.haze
            || config.binary != self.config.binary
            || config.debug.hover_diagnostics != self.config.debug.hover_diagnostics;
        if regenerate {
            self.driver
                .regenerate(&config)
                .map_err(DriverError::from)?;
            info!("Galaxy regenerated from reloaded config");
        }

        if config.camera != self.config.camera {
            let viewport = self.surface_wrapper.viewport();
            self.driver
                .set_camera(scene::camera(&config.camera, viewport.width, viewport.height));
        }

        self.driver
            .set_settings(&scene::compositor_settings(&config))
            .map_err(DriverError::from)?;

        if config.window != self.config.window {
            warn!("Window settings take effect on restart");
        }
        self.config = config;
        Ok(())
    }

    fn redraw(&mut self) -> Result<(), AppError> {
        let (Some(gpu), Some(compositor)) = (self.gpu.as_ref(), self.compositor.as_mut()) else {
            return Ok(());
        };
        let mut frame = compositor.begin_frame(gpu);
        let outcome = self
            .driver
            .frame(&mut frame, self.pointer)
            .map_err(DriverError::from)?;
        if let FrameOutcome::Skipped(reason) = outcome {
            debug!("Frame skipped: {reason:?}");
        }

        let frames = self.driver.clock().frame_count();
        if frames % STATS_INTERVAL == 0 {
            let stats = self.driver.stats();
            debug!(
                "Frame {frames}: {} stars, {} haze, {} hovered, {} drawables",
                stats.stars,
                stats.haze,
                stats.hovered,
                self.driver.drawables().len()
            );
        }
        Ok(())
    }
}

impl ApplicationHandler for GalaxyApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match event_loop.create_window(window_attributes(&self.config)) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                self.fail(event_loop, err.into());
                return;
            }
        };

        let size = window.inner_size();
        self.surface_wrapper = SurfaceWrapper::new(size.width, size.height, window.scale_factor());
        info!(
            "Surface wrapper initialized: {}x{} (scale: {:.2})",
            size.width,
            size.height,
            window.scale_factor()
        );

        let prefs = SurfacePreferences {
            vsync: self.config.window.vsync,
            transparent: self.config.window.transparent,
        };
        match init_render_context_blocking(window.clone(), prefs) {
            Ok(ctx) => {
                self.compositor = Some(GpuCompositor::new(
                    &ctx,
                    &scene::compositor_settings(&self.config),
                ));
                self.gpu = Some(ctx);
            }
            Err(err) => {
                self.fail(event_loop, err.into());
                return;
            }
        }

        self.driver.resize(size.width, size.height);
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => self.handle_resize(size.width, size.height),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                // winit follows up with a Resized event carrying the new size.
                self.surface_wrapper.handle_scale_factor_changed(scale_factor);
                info!("Scale factor changed to {scale_factor:.2}");
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor_moved(position.x, position.y);
            }
            WindowEvent::CursorLeft { .. } => self.handle_cursor_left(),
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() && !event.repeat => {
                match event.logical_key {
                    Key::Named(NamedKey::Escape) => event_loop.exit(),
                    Key::Named(NamedKey::F5) => {
                        if let Err(err) = self.reload_config() {
                            warn!("Config reload failed: {err}");
                        }
                    }
                    _ => {}
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    self.fail(event_loop, err);
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

/// Create an event loop and run until the window closes.
#[instrument(skip_all)]
pub fn run(config: Config, config_dir: PathBuf, cli: CliArgs) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    let mut app = GalaxyApp::new(config, config_dir, cli)?;
    event_loop.run_app(&mut app)?;
    match app.take_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
