//! Cosmetic full-screen effects on the base layer.
//!
//! Both effects resample the red and blue channels sideways and leave alpha
//! exactly as it was.

use noise::{NoiseFn, Value};

use crate::image::HdrImage;

/// Horizontal red/blue split.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AberrationParams {
    /// Shift in UV units.
    pub offset: f32,
    pub intensity: f32,
}

/// Animated film grain with a slight colour grade and vignette.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrainParams {
    pub grain_intensity: f32,
    /// Red/blue split, in hundredths of a UV unit.
    pub color_shift: f32,
}

/// Grain frequency in cells per UV unit.
pub const GRAIN_SCALE: f32 = 300.0;
/// Per-channel grain weights.
pub const GRAIN_CHANNEL_WEIGHTS: [f32; 3] = [0.1, 0.08, 0.12];
/// Vintage grade applied after grain.
pub const VINTAGE_GRADE: [f32; 3] = [1.05, 0.98, 1.02];

pub fn chromatic_aberration(src: &HdrImage, params: AberrationParams) -> HdrImage {
    split_channels(src, params.offset * params.intensity)
}

/// Vignette factor at a UV coordinate, in [0.7, 1].
pub fn vignette(u: f32, v: f32) -> f32 {
    let (dx, dy) = (u - 0.5, v - 0.5);
    (1.0 - (dx * dx + dy * dy).sqrt() * 0.3).clamp(0.7, 1.0)
}

/// Apply grain at `time` seconds. `noise` supplies value noise in [-1, 1].
pub fn vintage_grain(src: &HdrImage, params: GrainParams, time: f32, noise: &Value) -> HdrImage {
    let mut out = split_channels(src, params.color_shift * 0.01);
    let (w, h) = (src.width() as f32, src.height() as f32);
    for y in 0..src.height() {
        for x in 0..src.width() {
            let u = (x as f32 + 0.5) / w;
            let v = (y as f32 + 0.5) / h;
            let drift = (time * 0.1) as f64;
            let sample = noise.get([
                (u * GRAIN_SCALE) as f64 + drift,
                (v * GRAIN_SCALE) as f64 + drift,
            ]) as f32;
            let grain = sample * params.grain_intensity;
            let fade = vignette(u, v);
            let mut px = out.get(x, y);
            for c in 0..3 {
                px[c] = (px[c] + grain * GRAIN_CHANNEL_WEIGHTS[c]) * VINTAGE_GRADE[c] * fade;
            }
            out.set(x, y, px);
        }
    }
    out
}

fn split_channels(src: &HdrImage, shift: f32) -> HdrImage {
    let mut out = src.clone();
    let (w, h) = (src.width() as f32, src.height() as f32);
    for y in 0..src.height() {
        for x in 0..src.width() {
            let u = (x as f32 + 0.5) / w;
            let v = (y as f32 + 0.5) / h;
            let mut px = src.get(x, y);
            px[0] = src.sample(u + shift, v)[0];
            px[2] = src.sample(u - shift, v)[2];
            out.set(x, y, px);
        }
    }
    out
}
