//! Dust haze sprites drawn in the base layer.
//!
//! Haze fades out as the camera approaches so close-ups stay clear.

use galaxy_config::HazeConfig;
use galaxy_render::{Drawable, LayerMask, Shape, hex_to_rgb};
use glam::Vec3;

use crate::context::FrameContext;
use crate::sampler::RandomSampler;

/// Opacity for a camera distance already divided by the haze distance scale.
///
/// Rises as `(dist / 3)^1.8`, saturating at `max_opacity` from `dist = 3` on.
pub fn haze_opacity(scaled_distance: f32, max_opacity: f32) -> f32 {
    (max_opacity * (scaled_distance.max(0.0) / 3.0).powf(1.8)).clamp(0.0, max_opacity)
}

#[derive(Clone, Debug)]
pub struct Haze {
    local: Vec3,
    sprite: Option<Drawable>,
}

impl Haze {
    pub fn new(local: Vec3) -> Self {
        Self {
            local,
            sprite: None,
        }
    }

    pub fn local_position(&self) -> Vec3 {
        self.local
    }

    pub fn sprite(&self) -> Option<&Drawable> {
        self.sprite.as_ref()
    }

    /// Attach the sprite with a randomized scale in `[min_size, max_size]`.
    pub fn realize(&mut self, sampler: &mut RandomSampler, config: &HazeConfig) -> &Drawable {
        let scale = (config.max_size * sampler.uniform()).clamp(config.min_size, config.max_size);
        let local = self.local;
        self.sprite.get_or_insert_with(|| Drawable {
            position: local,
            size: scale,
            color: hex_to_rgb(config.color),
            intensity: config.opacity,
            opacity: config.opacity,
            layers: LayerMask::BASE,
            shape: Shape::Sprite,
        })
    }

    /// Recompute opacity from camera distance. No-op until realized.
    pub fn update(&mut self, ctx: &FrameContext<'_>, config: &HazeConfig) {
        let Some(sprite) = self.sprite.as_mut() else {
            return;
        };
        let world = ctx.to_world(self.local);
        let opacity = haze_opacity(ctx.scaled_distance(world, config.distance_scale), config.opacity);
        sprite.position = world;
        // Additive with source alpha: the emitted light scales with opacity too.
        sprite.intensity = opacity;
        sprite.opacity = opacity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galaxy_render::Camera;
    use glam::Mat4;

    #[test]
    fn test_opacity_bounds() {
        for step in 0..1000 {
            let d = step as f32 * 0.01;
            let o = haze_opacity(d, 0.15);
            assert!((0.0..=0.15).contains(&o), "{o} at {d}");
            if d > 0.0 {
                assert!(o > 0.0, "zero opacity at {d}");
            }
        }
        assert_eq!(haze_opacity(0.0, 0.15), 0.0);
        assert_eq!(haze_opacity(1e6, 0.15), 0.15);
    }

    #[test]
    fn test_opacity_decreases_as_camera_approaches() {
        let mut prev = haze_opacity(3.0, 0.15);
        for step in (0..300).rev() {
            let o = haze_opacity(step as f32 * 0.01, 0.15);
            assert!(o <= prev);
            prev = o;
        }
    }

    #[test]
    fn test_realized_scale_within_bounds() {
        let config = HazeConfig::default();
        let mut sampler = RandomSampler::seeded(4);
        for _ in 0..200 {
            let mut haze = Haze::new(Vec3::ZERO);
            let sprite = haze.realize(&mut sampler, &config);
            assert!((config.min_size..=config.max_size).contains(&sprite.size));
            assert_eq!(sprite.layers, LayerMask::BASE);
        }
    }

    #[test]
    fn test_update_sets_distance_opacity() {
        let config = HazeConfig::default();
        let camera = Camera {
            position: Vec3::new(0.0, 0.0, 375.0),
            ..Camera::default()
        };
        let ctx = FrameContext {
            camera: &camera,
            pointer: None,
            elapsed_ms: 0.0,
            frames: 1.0,
            world: Mat4::IDENTITY,
        };
        let mut haze = Haze::new(Vec3::ZERO);
        haze.update(&ctx, &config);
        assert!(haze.sprite().is_none());

        haze.realize(&mut RandomSampler::seeded(1), &config);
        haze.update(&ctx, &config);
        // 375 / 250 = 1.5, half the saturation distance.
        let expected = 0.15 * 0.5f32.powf(1.8);
        assert!((haze.sprite().unwrap().opacity - expected).abs() < 1e-6);
    }
}
