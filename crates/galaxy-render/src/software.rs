//! CPU pass executor for headless snapshots and tests.

use noise::Value;

use crate::bloom::apply_bloom;
use crate::camera::Camera;
use crate::compositor::{FrameInputs, PassExecutor, composite_overlay, merge_pixel};
use crate::drawable::{Drawable, Shape};
use crate::effects::{chromatic_aberration, vintage_grain};
use crate::error::RenderError;
use crate::graph::{Pass, Program, Target};
use crate::image::HdrImage;

/// Smallest on-screen radius, in pixels, so distant stars stay visible.
const MIN_RADIUS_PX: f32 = 0.75;
/// Sprite footprint, in radii.
const SPRITE_EXTENT: f32 = 1.5;
/// Pixel budget for a single target, guards against absurd snapshot sizes.
const MAX_TARGET_PIXELS: u64 = 64 * 1024 * 1024;

/// Rasterizes drawables into [`HdrImage`] targets.
pub struct SoftwareRenderer {
    targets: Vec<HdrImage>,
    grain_noise: Value,
}

impl SoftwareRenderer {
    pub fn new() -> Self {
        Self {
            targets: (0..Target::COUNT).map(|_| HdrImage::new(0, 0)).collect(),
            grain_noise: Value::new(0x6a1a_c71c),
        }
    }

    /// Contents of a target after the last frame.
    pub fn target(&self, target: Target) -> &HdrImage {
        &self.targets[target.index()]
    }

    /// The presented frame.
    pub fn frame(&self) -> &HdrImage {
        self.target(Target::Screen)
    }

    fn input(&self, pass: &Pass, slot: usize) -> Result<&HdrImage, RenderError> {
        let target = pass.inputs.get(slot).ok_or(RenderError::InputCount {
            pass: pass.label,
            expected: slot + 1,
            actual: pass.inputs.len(),
        })?;
        Ok(self.target(*target))
    }

    fn draw_scene(&mut self, pass: &Pass, inputs: &FrameInputs<'_>) {
        let out = &mut self.targets[pass.output.index()];
        out.clear([0.0; 4]);
        let Some(filter) = pass.filter else {
            return;
        };
        for drawable in inputs.drawables.iter().filter(|d| d.layers.intersects(filter)) {
            rasterize(out, drawable, inputs.camera);
        }
    }

    fn merge(&self, pass: &Pass) -> Result<HdrImage, RenderError> {
        let base = self.input(pass, 0)?;
        let bloom = self.input(pass, 1)?;
        let overlay = self.input(pass, 2)?;
        let mut out = HdrImage::new(base.width(), base.height());
        for (i, px) in out.pixels_mut().iter_mut().enumerate() {
            let merged = merge_pixel(base.pixels()[i], bloom.pixels()[i]);
            *px = composite_overlay(merged, overlay.pixels()[i]);
        }
        Ok(out)
    }
}

impl Default for SoftwareRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PassExecutor for SoftwareRenderer {
    fn prepare(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width as u64 * height as u64 > MAX_TARGET_PIXELS {
            return Err(RenderError::TargetAllocation {
                width,
                height,
                reason: format!("exceeds {MAX_TARGET_PIXELS} pixels"),
            });
        }
        let current = &self.targets[0];
        if current.width() != width || current.height() != height {
            log::debug!("Allocating software targets at {width}x{height}");
            for target in &mut self.targets {
                *target = HdrImage::new(width, height);
            }
        }
        Ok(())
    }

    fn execute(&mut self, pass: &Pass, inputs: &FrameInputs<'_>) -> Result<(), RenderError> {
        let result = match &pass.program {
            Program::Clear => {
                self.targets[pass.output.index()].clear([0.0; 4]);
                return Ok(());
            }
            Program::Scene => {
                self.draw_scene(pass, inputs);
                return Ok(());
            }
            Program::BloomFilter(config) => apply_bloom(self.input(pass, 0)?, config),
            Program::ChromaticAberration(params) => {
                chromatic_aberration(self.input(pass, 0)?, *params)
            }
            Program::VintageGrain(params) => {
                vintage_grain(self.input(pass, 0)?, *params, inputs.time, &self.grain_noise)
            }
            Program::Merge => self.merge(pass)?,
            Program::Present { exposure } => self.input(pass, 0)?.tonemapped(*exposure),
        };
        self.targets[pass.output.index()] = result;
        Ok(())
    }
}

/// Screen-space footprint of a drawable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Footprint {
    pub center_x: f32,
    pub center_y: f32,
    pub radius: f32,
}

/// Project a drawable to pixel coordinates, or `None` if it is behind the camera.
pub fn footprint(drawable: &Drawable, camera: &Camera, width: u32, height: u32) -> Option<Footprint> {
    let projected = camera.project(drawable.position)?;
    let half_h = height as f32 * 0.5;
    Some(Footprint {
        center_x: (projected.ndc.x + 1.0) * 0.5 * width as f32,
        center_y: (1.0 - projected.ndc.y) * half_h,
        radius: (drawable.size * projected.ndc_per_unit * half_h).max(MIN_RADIUS_PX),
    })
}

/// Coverage at normalized distance `t = d / radius`.
pub fn falloff(shape: Shape, t: f32) -> f32 {
    match shape {
        Shape::Sprite => {
            if t > SPRITE_EXTENT {
                0.0
            } else {
                (-2.0 * t * t).exp()
            }
        }
        Shape::Disc => {
            if t <= 1.0 {
                1.0
            } else {
                0.0
            }
        }
        Shape::Glow => {
            let f = (1.0 - t).max(0.0);
            f * f
        }
    }
}

fn rasterize(out: &mut HdrImage, drawable: &Drawable, camera: &Camera) {
    let Some(fp) = footprint(drawable, camera, out.width(), out.height()) else {
        return;
    };
    let extent = match drawable.shape {
        Shape::Sprite => fp.radius * SPRITE_EXTENT,
        Shape::Disc | Shape::Glow => fp.radius,
    };
    let (w, h) = (out.width() as f32, out.height() as f32);
    if fp.center_x + extent < 0.0
        || fp.center_y + extent < 0.0
        || fp.center_x - extent > w
        || fp.center_y - extent > h
    {
        return;
    }

    let x0 = (fp.center_x - extent).floor().max(0.0) as u32;
    let y0 = (fp.center_y - extent).floor().max(0.0) as u32;
    let x1 = ((fp.center_x + extent).ceil() as u32).min(out.width());
    let y1 = ((fp.center_y + extent).ceil() as u32).min(out.height());
    let radiance = drawable.radiance();
    let opacity = drawable.opacity.clamp(0.0, 1.0);

    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f32 + 0.5 - fp.center_x;
            let dy = y as f32 + 0.5 - fp.center_y;
            let coverage = falloff(drawable.shape, (dx * dx + dy * dy).sqrt() / fp.radius);
            if coverage <= 0.0 {
                continue;
            }
            let mut px = out.get(x, y);
            for c in 0..3 {
                px[c] += radiance[c] * coverage;
            }
            let a = coverage * opacity;
            px[3] = a + px[3] * (1.0 - a);
            out.set(x, y, px);
        }
    }
}
