//! Viewport tracking across resize and scale-factor events.
//!
//! The GPU surface can never be zero-sized, so it is clamped to 1x1. The
//! reported viewport is not clamped: a minimised window has a zero viewport
//! and the compositor skips frames until it grows again.

/// Minimum surface dimension handed to wgpu.
pub const MIN_SURFACE_DIMENSION: u32 = 1;

/// Physical pixel dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhysicalSize {
    pub width: u32,
    pub height: u32,
}

/// Produced when the viewport actually changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportChange {
    /// Unclamped viewport in physical pixels.
    pub viewport: PhysicalSize,
    /// Clamped size for surface configuration.
    pub surface: PhysicalSize,
    pub scale_factor: f64,
}

/// Tracks the window's physical size and scale factor.
#[derive(Clone, Debug)]
pub struct SurfaceWrapper {
    width: u32,
    height: u32,
    scale_factor: f64,
}

impl SurfaceWrapper {
    pub fn new(physical_width: u32, physical_height: u32, scale_factor: f64) -> Self {
        Self {
            width: physical_width,
            height: physical_height,
            scale_factor,
        }
    }

    /// Returns a change event if the dimensions differ from the last known size.
    pub fn handle_resize(&mut self, physical_width: u32, physical_height: u32) -> Option<ViewportChange> {
        if (physical_width, physical_height) == (self.width, self.height) {
            return None;
        }
        self.width = physical_width;
        self.height = physical_height;
        Some(self.change())
    }

    pub fn handle_scale_factor_changed(&mut self, scale_factor: f64) {
        self.scale_factor = scale_factor;
    }

    fn change(&self) -> ViewportChange {
        ViewportChange {
            viewport: self.viewport(),
            surface: self.surface_size(),
            scale_factor: self.scale_factor,
        }
    }

    /// Unclamped size, may be zero.
    pub fn viewport(&self) -> PhysicalSize {
        PhysicalSize {
            width: self.width,
            height: self.height,
        }
    }

    /// Size clamped for wgpu surface configuration.
    pub fn surface_size(&self) -> PhysicalSize {
        PhysicalSize {
            width: self.width.max(MIN_SURFACE_DIMENSION),
            height: self.height.max(MIN_SURFACE_DIMENSION),
        }
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Whether a frame drawn now would cover any pixels.
    pub fn is_renderable(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Convert a cursor position in physical pixels to NDC, y up.
    ///
    /// Returns `None` on a zero viewport.
    pub fn cursor_to_ndc(&self, x: f64, y: f64) -> Option<glam::Vec2> {
        if !self.is_renderable() {
            return None;
        }
        Some(glam::Vec2::new(
            (x / self.width as f64 * 2.0 - 1.0) as f32,
            (1.0 - y / self.height as f64 * 2.0) as f32,
        ))
    }
}
