//! Procedural placement of stars and haze into galactic regions.
//!
//! Stars fill a gaussian core, a wider outer core, `A` spiral arms and a
//! sparse outer rim. Haze clusters near the core (10%) and along the arms
//! (90%) with tighter spreads. Every split floor-truncates, so the produced
//! total may fall short of the requested one by at most `3 + (A - 1)`.

use std::f32::consts::TAU;

use galaxy_config::GalaxyConfig;
use glam::Vec3;

use crate::sampler::RandomSampler;
use crate::spiral::SpiralTransform;

/// Haze budget split: tenths placed around the core, the rest along the arms.
pub const CORE_HAZE_TENTHS: u32 = 1;

/// Region a generated position belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    Core,
    OuterCore,
    Arm(u32),
    OuterRim,
    CoreHaze,
    ArmHaze(u32),
}

/// Errors rejected when the generator is built. No field is produced.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GenerationError {
    #[error("galaxy needs at least one arm")]
    NoArms,

    #[error("{field} must be a finite, non-negative spread, got {value}")]
    InvalidSpread { field: &'static str, value: f32 },

    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f32 },

    #[error("{field} must lie in [0, 1], got {value}")]
    InvalidRatio { field: &'static str, value: f32 },

    #[error("outer rim radius bounds are inverted or negative: [{min}, {max}]")]
    InvalidRimBounds { min: f32, max: f32 },
}

/// Star counts per region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegionCounts {
    pub core: u32,
    pub outer_core: u32,
    pub per_arm: u32,
    pub arms: u32,
    pub outer_rim: u32,
}

impl RegionCounts {
    /// Summed in `u64`: the rim sits on top of `num_stars`, so the total can
    /// exceed `u32::MAX`.
    pub fn total(&self) -> u64 {
        u64::from(self.core)
            + u64::from(self.outer_core)
            + u64::from(self.per_arm) * u64::from(self.arms)
            + u64::from(self.outer_rim)
    }
}

/// Haze counts per region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HazeCounts {
    pub core: u32,
    pub per_arm: u32,
    pub arms: u32,
}

impl HazeCounts {
    pub fn total(&self) -> u64 {
        u64::from(self.core) + u64::from(self.per_arm) * u64::from(self.arms)
    }
}

/// Validated generation parameters.
#[derive(Clone, Debug)]
pub struct FieldGenerator {
    config: GalaxyConfig,
    spiral: SpiralTransform,
}

impl FieldGenerator {
    pub fn new(config: &GalaxyConfig) -> Result<Self, GenerationError> {
        if config.num_arms == 0 {
            return Err(GenerationError::NoArms);
        }

        let spreads = [
            ("thickness", config.thickness),
            ("core_x_dist", config.core_x_dist),
            ("core_y_dist", config.core_y_dist),
            ("outer_core_x_dist", config.outer_core_x_dist),
            ("outer_core_y_dist", config.outer_core_y_dist),
            ("arm_x_dist", config.arm_x_dist),
            ("arm_y_dist", config.arm_y_dist),
        ];
        for (field, value) in spreads {
            if !value.is_finite() || value < 0.0 {
                return Err(GenerationError::InvalidSpread { field, value });
            }
        }
        // Also the winding length scale, so it must be strictly positive.
        if config.arm_x_dist == 0.0 {
            return Err(GenerationError::InvalidSpread {
                field: "arm_x_dist",
                value: 0.0,
            });
        }

        for (field, value) in [
            ("arm_x_mean", config.arm_x_mean),
            ("arm_y_mean", config.arm_y_mean),
            ("spiral", config.spiral),
        ] {
            if !value.is_finite() {
                return Err(GenerationError::NonFinite { field, value });
            }
        }

        for (field, value) in [
            ("haze_ratio", config.haze_ratio),
            ("outer_star_ratio", config.outer_star_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(GenerationError::InvalidRatio { field, value });
            }
        }

        let (min, max) = (config.outer_star_radius_min, config.outer_star_radius_max);
        if !(min.is_finite() && max.is_finite() && min >= 0.0 && min <= max) {
            return Err(GenerationError::InvalidRimBounds { min, max });
        }

        Ok(Self {
            config: config.clone(),
            spiral: SpiralTransform::new(config.spiral, config.arm_x_dist),
        })
    }

    pub fn spiral(&self) -> SpiralTransform {
        self.spiral
    }

    pub fn star_counts(&self) -> RegionCounts {
        let n = self.config.num_stars;
        let arms = self.config.num_arms;
        RegionCounts {
            core: n / 4,
            outer_core: n / 4,
            per_arm: (n / 2) / arms,
            arms,
            outer_rim: fraction_of(n, self.config.outer_star_ratio),
        }
    }

    pub fn haze_counts(&self) -> HazeCounts {
        let total = fraction_of(self.config.num_stars, self.config.haze_ratio) as u64;
        let arms = self.config.num_arms;
        let core = total * CORE_HAZE_TENTHS as u64 / 10;
        let arm_total = total * (10 - CORE_HAZE_TENTHS) as u64 / 10;
        HazeCounts {
            core: core as u32,
            per_arm: (arm_total / arms as u64) as u32,
            arms,
        }
    }

    fn arm_offset(&self, arm: u32) -> f32 {
        arm as f32 * TAU / self.config.num_arms as f32
    }

    /// Place every star and bind it through `factory`.
    pub fn generate_stars<T>(
        &self,
        sampler: &mut RandomSampler,
        mut factory: impl FnMut(Region, Vec3) -> T,
    ) -> Vec<T> {
        let c = &self.config;
        let counts = self.star_counts();
        let mut out = Vec::with_capacity(counts.total() as usize);

        for _ in 0..counts.core {
            let pos = Vec3::new(
                sampler.gaussian(0.0, c.core_x_dist),
                sampler.gaussian(0.0, c.core_y_dist),
                sampler.gaussian(0.0, c.thickness),
            );
            out.push(factory(Region::Core, pos));
        }

        for _ in 0..counts.outer_core {
            let pos = Vec3::new(
                sampler.gaussian(0.0, c.outer_core_x_dist),
                sampler.gaussian(0.0, c.outer_core_y_dist),
                sampler.gaussian(0.0, c.thickness),
            );
            out.push(factory(Region::OuterCore, pos));
        }

        for arm in 0..counts.arms {
            let offset = self.arm_offset(arm);
            for _ in 0..counts.per_arm {
                let pos = self.spiral.apply(
                    sampler.gaussian(c.arm_x_mean, c.arm_x_dist),
                    sampler.gaussian(c.arm_y_mean, c.arm_y_dist),
                    sampler.gaussian(0.0, c.thickness),
                    offset,
                );
                out.push(factory(Region::Arm(arm), pos));
            }
        }

        for _ in 0..counts.outer_rim {
            let angle = sampler.uniform() * TAU;
            let radius = sampler.uniform_range(c.outer_star_radius_min, c.outer_star_radius_max);
            let pos = Vec3::new(
                radius * angle.cos(),
                radius * angle.sin(),
                sampler.gaussian(0.0, c.thickness * 0.5),
            );
            out.push(factory(Region::OuterRim, pos));
        }

        log::debug!(
            "Generated {} stars ({} core, {} outer core, {}x{} arm, {} rim)",
            out.len(),
            counts.core,
            counts.outer_core,
            counts.arms,
            counts.per_arm,
            counts.outer_rim
        );
        out
    }

    /// Place every haze sprite and bind it through `factory`.
    pub fn generate_haze<T>(
        &self,
        sampler: &mut RandomSampler,
        mut factory: impl FnMut(Region, Vec3) -> T,
    ) -> Vec<T> {
        let c = &self.config;
        let counts = self.haze_counts();
        let mut out = Vec::with_capacity(counts.total() as usize);

        for _ in 0..counts.core {
            let pos = Vec3::new(
                sampler.gaussian(0.0, c.outer_core_x_dist * 0.7),
                sampler.gaussian(0.0, c.outer_core_y_dist * 0.7),
                sampler.gaussian(0.0, c.thickness * 0.5),
            );
            out.push(factory(Region::CoreHaze, pos));
        }

        for arm in 0..counts.arms {
            let offset = self.arm_offset(arm);
            for _ in 0..counts.per_arm {
                let radius = sampler.gaussian(c.arm_x_mean * 0.8, c.arm_x_dist * 0.6);
                // Jitter breaks up banding along the arm.
                let angle = offset + sampler.gaussian(0.0, 0.2);
                let pos = self.spiral.apply(
                    radius,
                    sampler.gaussian(c.arm_y_mean * 0.7, c.arm_y_dist * 0.5),
                    sampler.gaussian(0.0, c.thickness * 0.7),
                    angle,
                );
                out.push(factory(Region::ArmHaze(arm), pos));
            }
        }

        log::debug!("Generated {} haze sprites", out.len());
        out
    }
}

/// `floor(n * ratio)`, multiplied in `f32` so decimal ratios such as 0.06
/// land on the whole count they denote.
fn fraction_of(n: u32, ratio: f32) -> u32 {
    (n as f32 * ratio).floor() as u32
}
