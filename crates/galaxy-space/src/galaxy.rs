//! The galaxy container: generated bodies plus the transform they share.

use galaxy_config::{Config, HazeConfig, StarConfig};
use galaxy_render::{Camera, Drawable};
use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

use crate::binary::BinarySystem;
use crate::context::FrameContext;
use crate::generator::{FieldGenerator, GenerationError};
use crate::haze::Haze;
use crate::sampler::RandomSampler;
use crate::star::Star;
use crate::star_types::{StarTypeError, StarTypeTable};

/// Hover brightness above which diagnostics report a star.
const HOVER_LOG_THRESHOLD: f32 = 0.1;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GalaxyError {
    #[error("invalid field configuration: {0}")]
    Generation(#[from] GenerationError),

    #[error("invalid star type table: {0}")]
    StarTypes(#[from] StarTypeError),

    #[error("invalid range `{field}`: [{min}, {max}]")]
    InvalidRange {
        field: &'static str,
        min: f32,
        max: f32,
    },
}

/// `min..=max` must be finite and ordered before it reaches `f32::clamp`.
fn check_range(field: &'static str, min: f32, max: f32) -> Result<(), GalaxyError> {
    if min.is_finite() && max.is_finite() && min <= max {
        Ok(())
    } else {
        Err(GalaxyError::InvalidRange { field, min, max })
    }
}

fn check_body_bounds(stars: &StarConfig, haze: &HazeConfig) -> Result<(), GalaxyError> {
    check_range("stars.size", stars.min_size, stars.max_size)?;
    check_range("stars.opacity", stars.min_opacity, stars.max_opacity)?;
    check_range("haze.size", haze.min_size, haze.max_size)?;
    check_range("haze.opacity", 0.0, haze.opacity)
}

/// Per-frame counters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UpdateStats {
    pub stars: usize,
    pub haze: usize,
    /// Stars with any hover brightness.
    pub hovered: usize,
}

pub struct Galaxy {
    orientation: [f32; 3],
    offset: Vec3,
    spin: f32,
    spin_per_frame: f32,
    stars: Vec<Star>,
    haze: Vec<Haze>,
    binary: Option<BinarySystem>,
    star_config: StarConfig,
    haze_config: HazeConfig,
    hover_diagnostics: bool,
}

impl Galaxy {
    /// Generate and realize every body. Configuration errors abort before
    /// anything is placed.
    pub fn generate(config: &Config, sampler: &mut RandomSampler) -> Result<Self, GalaxyError> {
        check_body_bounds(&config.stars, &config.haze)?;
        let table = StarTypeTable::new(&config.stars.types)?;
        let generator = FieldGenerator::new(&config.galaxy)?;

        let star_positions = generator.generate_stars(sampler, |_, pos| pos);
        let mut stars: Vec<Star> = star_positions
            .into_iter()
            .map(|pos| Star::new(pos, &table, sampler))
            .collect();
        for star in &mut stars {
            star.realize();
        }

        let mut haze = generator.generate_haze(sampler, |_, pos| Haze::new(pos));
        for h in &mut haze {
            h.realize(sampler, &config.haze);
        }

        let binary = config
            .binary
            .enabled
            .then(|| BinarySystem::new(&config.binary));

        log::info!(
            "Galaxy generated: {} stars, {} haze, {} arms",
            stars.len(),
            haze.len(),
            config.galaxy.num_arms
        );

        Ok(Self {
            orientation: config.galaxy.orientation,
            offset: Vec3::from_array(config.galaxy.offset),
            spin: 0.0,
            spin_per_frame: config.galaxy.spin_per_frame,
            stars,
            haze,
            binary,
            star_config: config.stars.clone(),
            haze_config: config.haze.clone(),
            hover_diagnostics: config.debug.hover_diagnostics,
        })
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn haze(&self) -> &[Haze] {
        &self.haze
    }

    pub fn binary(&self) -> Option<&BinarySystem> {
        self.binary.as_ref()
    }

    /// Accumulated spin about the container's Z axis, in radians.
    pub fn spin(&self) -> f32 {
        self.spin
    }

    /// Local-to-world transform: orientation with spin folded into Z, then offset.
    pub fn transform(&self) -> Mat4 {
        let [x, y, z] = self.orientation;
        let rotation = Quat::from_euler(EulerRot::XYZ, x, y, z + self.spin);
        Mat4::from_rotation_translation(rotation, self.offset)
    }

    /// Advance one frame: spin the container and the binary pivot, then
    /// animate every body against the new transform.
    pub fn update(
        &mut self,
        camera: &Camera,
        pointer: Option<Vec2>,
        elapsed_ms: f64,
        frames: f32,
    ) -> UpdateStats {
        self.spin = (self.spin + self.spin_per_frame * frames) % std::f32::consts::TAU;
        if let Some(binary) = self.binary.as_mut() {
            binary.advance(frames);
        }

        let ctx = FrameContext {
            camera,
            pointer,
            elapsed_ms,
            frames,
            world: self.transform(),
        };

        let mut stats = UpdateStats {
            stars: self.stars.len(),
            haze: self.haze.len(),
            hovered: 0,
        };
        for (index, star) in self.stars.iter_mut().enumerate() {
            let anim = star.update(&ctx, &self.star_config);
            if anim.hover.brightness > 0.0 {
                stats.hovered += 1;
            }
            if self.hover_diagnostics && anim.hover.brightness > HOVER_LOG_THRESHOLD {
                log::debug!(
                    "Star {index} hovered: brightness {:.3}, target {:.3}, opacity {:.3}",
                    anim.hover.brightness,
                    anim.hover.target,
                    anim.opacity
                );
            }
        }
        for haze in &mut self.haze {
            haze.update(&ctx, &self.haze_config);
        }
        stats
    }

    /// Append every realized drawable in world space.
    pub fn collect_drawables(&self, out: &mut Vec<Drawable>) {
        out.extend(self.stars.iter().filter_map(|s| s.sprite().copied()));
        out.extend(self.haze.iter().filter_map(|h| h.sprite().copied()));
        if let Some(binary) = &self.binary {
            out.extend(binary.drawables(self.transform()));
        }
    }

    pub fn drawables(&self) -> Vec<Drawable> {
        let mut out = Vec::with_capacity(self.stars.len() + self.haze.len() + 8);
        self.collect_drawables(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galaxy_render::{LayerMask, Projection};

    fn config(num_stars: u32) -> Config {
        let mut config = Config::default();
        config.galaxy.num_stars = num_stars;
        config.galaxy.seed = Some(1);
        config
    }

    fn camera() -> Camera {
        Camera::looking_at(
            Vec3::new(375.0, 750.0, 750.0),
            Vec3::new(400.0, 0.0, 0.0),
            Vec3::Z,
            Projection {
                fov_y: 30f32.to_radians(),
                aspect_ratio: 16.0 / 9.0,
            },
            0.1,
            5_000_000.0,
        )
    }

    #[test]
    fn test_generate_realizes_everything() {
        let galaxy = Galaxy::generate(&config(400), &mut RandomSampler::seeded(1)).unwrap();
        assert_eq!(galaxy.stars().len(), 424);
        assert_eq!(galaxy.haze().len(), 100);
        assert!(galaxy.stars().iter().all(Star::is_realized));
        assert_eq!(galaxy.drawables().len(), 424 + 100 + 8);
    }

    #[test]
    fn test_layer_assignment() {
        let galaxy = Galaxy::generate(&config(100), &mut RandomSampler::seeded(2)).unwrap();
        let drawables = galaxy.drawables();
        let bloom_only = drawables.iter().filter(|d| d.layers == LayerMask::BLOOM).count();
        let base_only = drawables.iter().filter(|d| d.layers == LayerMask::BASE).count();
        let both = drawables
            .iter()
            .filter(|d| d.layers == LayerMask::BASE_AND_BLOOM)
            .count();
        assert_eq!(bloom_only, galaxy.stars().len());
        assert_eq!(base_only, galaxy.haze().len());
        assert_eq!(both, 8);
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let mut bad = config(100);
        bad.galaxy.num_arms = 0;
        assert_eq!(
            Galaxy::generate(&bad, &mut RandomSampler::seeded(0)).err(),
            Some(GalaxyError::Generation(GenerationError::NoArms))
        );
        let mut bad = config(100);
        bad.stars.types.clear();
        assert!(matches!(
            Galaxy::generate(&bad, &mut RandomSampler::seeded(0)),
            Err(GalaxyError::StarTypes(StarTypeError::Empty))
        ));
    }

    #[test]
    fn test_inverted_body_bounds_are_rejected() {
        let mut bad = config(100);
        bad.haze.min_size = bad.haze.max_size + 1.0;
        assert_eq!(
            Galaxy::generate(&bad, &mut RandomSampler::seeded(0)).err(),
            Some(GalaxyError::InvalidRange {
                field: "haze.size",
                min: 36.0,
                max: 35.0,
            })
        );

        let mut bad = config(100);
        bad.stars.min_size = bad.stars.max_size * 2.0;
        assert!(matches!(
            Galaxy::generate(&bad, &mut RandomSampler::seeded(0)),
            Err(GalaxyError::InvalidRange { field: "stars.size", .. })
        ));

        let mut bad = config(100);
        bad.stars.max_opacity = f32::NAN;
        assert!(matches!(
            Galaxy::generate(&bad, &mut RandomSampler::seeded(0)),
            Err(GalaxyError::InvalidRange { field: "stars.opacity", .. })
        ));

        let mut bad = config(100);
        bad.haze.opacity = -0.5;
        assert!(matches!(
            Galaxy::generate(&bad, &mut RandomSampler::seeded(0)),
            Err(GalaxyError::InvalidRange { field: "haze.opacity", .. })
        ));
    }

    #[test]
    fn test_disabled_binary_is_absent() {
        let mut cfg = config(40);
        cfg.binary.enabled = false;
        let galaxy = Galaxy::generate(&cfg, &mut RandomSampler::seeded(3)).unwrap();
        assert!(galaxy.binary().is_none());
        assert_eq!(galaxy.drawables().len(), galaxy.stars().len() + galaxy.haze().len());
    }

    #[test]
    fn test_transform_applies_offset_and_spin() {
        let mut galaxy = Galaxy::generate(&config(40), &mut RandomSampler::seeded(4)).unwrap();
        assert_eq!(
            galaxy.transform().transform_point3(Vec3::ZERO),
            Vec3::new(-250.0, 0.0, 0.0)
        );
        let cam = camera();
        galaxy.update(&cam, None, 0.0, 10.0);
        assert!((galaxy.spin() + 0.01).abs() < 1e-6);
        assert!((galaxy.binary().unwrap().angle() - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_spin_moves_sprites_but_not_local_positions() {
        let mut galaxy = Galaxy::generate(&config(40), &mut RandomSampler::seeded(5)).unwrap();
        let cam = camera();
        galaxy.update(&cam, None, 0.0, 1.0);
        let local = galaxy.stars()[0].local_position();
        let first = galaxy.stars()[0].sprite().unwrap().position;
        galaxy.update(&cam, None, 16.7, 100.0);
        assert_eq!(galaxy.stars()[0].local_position(), local);
        assert_ne!(galaxy.stars()[0].sprite().unwrap().position, first);
    }

    #[test]
    fn test_update_reports_counts() {
        let mut galaxy = Galaxy::generate(&config(80), &mut RandomSampler::seeded(6)).unwrap();
        let stats = galaxy.update(&camera(), None, 0.0, 1.0);
        assert_eq!(stats.stars, galaxy.stars().len());
        assert_eq!(stats.haze, galaxy.haze().len());
        assert_eq!(stats.hovered, 0);
    }
}
