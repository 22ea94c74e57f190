//! Layered compositor: runs a [`FramePlan`] through a [`PassExecutor`].

use crate::camera::Camera;
use crate::drawable::Drawable;
use crate::error::RenderError;
use crate::graph::{CompositorSettings, FramePlan, Pass};
use crate::image::Rgba;

/// Read-only snapshot handed to every pass of a frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameInputs<'a> {
    pub drawables: &'a [Drawable],
    pub camera: &'a Camera,
    /// Seconds since start, for time-driven effects.
    pub time: f32,
}

/// Something that owns render targets and can run passes against them.
pub trait PassExecutor {
    /// Make sure targets exist at `width` x `height`. Called once per frame
    /// before any pass.
    fn prepare(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    fn execute(&mut self, pass: &Pass, inputs: &FrameInputs<'_>) -> Result<(), RenderError>;

    /// Called after the last pass.
    fn finish(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Why a frame produced no image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    ZeroViewport,
    TargetAllocation,
    SurfaceUnavailable,
}

/// Result of [`Compositor::render`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered,
    Skipped(SkipReason),
}

/// Holds the frame plan and the viewport size.
pub struct Compositor {
    plan: FramePlan,
    width: u32,
    height: u32,
}

impl Compositor {
    pub fn new(settings: &CompositorSettings, width: u32, height: u32) -> Result<Self, RenderError> {
        let plan = FramePlan::layered(settings);
        plan.validate()?;
        Ok(Self {
            plan,
            width,
            height,
        })
    }

    pub fn plan(&self) -> &FramePlan {
        &self.plan
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Record a new viewport size. Executors reallocate in their next `prepare`.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != (self.width, self.height) {
            log::debug!("Compositor resized to {width}x{height}");
        }
        self.width = width;
        self.height = height;
    }

    /// Rebuild the plan from new settings.
    pub fn set_settings(&mut self, settings: &CompositorSettings) -> Result<(), RenderError> {
        let plan = FramePlan::layered(settings);
        plan.validate()?;
        self.plan = plan;
        Ok(())
    }

    /// Run every pass in order.
    ///
    /// A zero-sized viewport, failed target allocation or missing surface
    /// skips the frame with a warning. Other errors propagate.
    pub fn render<E: PassExecutor + ?Sized>(
        &self,
        executor: &mut E,
        inputs: &FrameInputs<'_>,
    ) -> Result<FrameOutcome, RenderError> {
        if self.width == 0 || self.height == 0 {
            log::warn!(
                "Skipping frame: viewport is {}x{}",
                self.width,
                self.height
            );
            return Ok(FrameOutcome::Skipped(SkipReason::ZeroViewport));
        }

        let result = executor
            .prepare(self.width, self.height)
            .and_then(|()| {
                for pass in self.plan.passes() {
                    log::trace!("Running pass {}", pass.label);
                    executor.execute(pass, inputs)?;
                }
                executor.finish()
            });

        match result {
            Ok(()) => Ok(FrameOutcome::Rendered),
            Err(err) if err.skips_frame() => {
                log::warn!("Skipping frame: {err}");
                let reason = match err {
                    RenderError::SurfaceUnavailable(_) => SkipReason::SurfaceUnavailable,
                    _ => SkipReason::TargetAllocation,
                };
                Ok(FrameOutcome::Skipped(reason))
            }
            Err(err) => Err(err),
        }
    }
}

/// Additive merge of base and bloom: colours add, alpha takes the maximum.
pub fn merge_pixel(base: Rgba, bloom: Rgba) -> Rgba {
    [
        base[0] + bloom[0],
        base[1] + bloom[1],
        base[2] + bloom[2],
        base[3].max(bloom[3]),
    ]
}

/// Lay the overlay over a merged pixel by the overlay's alpha. The merged
/// alpha is left unchanged.
pub fn composite_overlay(merged: Rgba, overlay: Rgba) -> Rgba {
    let a = overlay[3].clamp(0.0, 1.0);
    [
        merged[0] * (1.0 - a) + overlay[0],
        merged[1] * (1.0 - a) + overlay[1],
        merged[2] * (1.0 - a) + overlay[2],
        merged[3],
    ]
}
