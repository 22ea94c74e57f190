//! Renderer-facing description of a single visible body.

use glam::Vec3;

use crate::image::srgb_to_linear;
use crate::layers::LayerMask;

/// How a drawable's footprint falls off from its center.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    /// Soft gaussian point, used for stars and haze.
    Sprite,
    /// Solid disc with a hard edge, used for sun cores.
    Disc,
    /// Quadratic falloff to zero at the radius, used for sun shells and lights.
    Glow,
}

/// A camera-facing billboard in world space.
///
/// `size` is the world-space radius. `color` is linear RGB (see [`hex_to_rgb`]); the emitted
/// radiance is `color * intensity`, and `intensity` may exceed 1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Drawable {
    pub position: Vec3,
    pub size: f32,
    pub color: [f32; 3],
    pub intensity: f32,
    /// Coverage of the sprite center, used for the alpha channel.
    pub opacity: f32,
    pub layers: LayerMask,
    pub shape: Shape,
}

impl Drawable {
    pub fn radiance(&self) -> [f32; 3] {
        self.color.map(|c| c * self.intensity)
    }
}

/// Decode a packed sRGB `0xRRGGBB` colour into linear floats in [0, 1].
pub fn hex_to_rgb(hex: u32) -> [f32; 3] {
    [16, 8, 0].map(|shift| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_rgb_decodes_srgb() {
        let close = |a: [f32; 3], b: [f32; 3]| a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-5);
        assert!(close(hex_to_rgb(0xff0000), [1.0, 0.0, 0.0]));
        assert!(close(hex_to_rgb(0x00ff00), [0.0, 1.0, 0.0]));
        assert!(close(hex_to_rgb(0x0000ff), [0.0, 0.0, 1.0]));
        // sRGB 0x80 is about 0.2158 linear, well below the raw 0.502.
        let grey = hex_to_rgb(0x808080);
        assert!((grey[0] - 0.215_861).abs() < 1e-4, "got {grey:?}");
        let haze = hex_to_rgb(0xff2800);
        assert!((haze[1] - srgb_to_linear(40.0 / 255.0)).abs() < 1e-6);
    }

    #[test]
    fn test_radiance_scales_with_intensity() {
        let drawable = Drawable {
            position: Vec3::ZERO,
            size: 1.0,
            color: [0.5, 0.25, 1.0],
            intensity: 2.0,
            opacity: 1.0,
            layers: LayerMask::BASE,
            shape: Shape::Sprite,
        };
        assert_eq!(drawable.radiance(), [1.0, 0.5, 2.0]);
    }
}
