//! Central binary star system.
//!
//! Two suns sit at opposite ends of a pivot that turns at a constant rate.
//! Suns keep a fixed world size regardless of camera distance and draw into
//! both the base and bloom layers.

use galaxy_config::BinaryConfig;
use galaxy_render::{Drawable, LayerMask, Shape, hex_to_rgb};
use glam::{Mat4, Quat, Vec3};

/// Additive halo around a sun core.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlowShell {
    pub radius: f32,
    pub color: u32,
    pub opacity: f32,
}

/// Light emitted by a sun, for lit consumers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub color: u32,
    pub intensity: f32,
    pub range: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SunBody {
    pub radius: f32,
    pub core_color: u32,
    pub emissive: u32,
    pub emissive_intensity: f32,
    pub shells: [GlowShell; 3],
    pub lights: [PointLight; 3],
}

impl SunBody {
    /// White-hot primary with a yellow to red corona.
    pub const PRIMARY: SunBody = SunBody {
        radius: 8.0,
        core_color: 0xffffff,
        emissive: 0xffffaa,
        emissive_intensity: 8.0,
        shells: [
            GlowShell { radius: 8.5, color: 0xffff00, opacity: 0.7 },
            GlowShell { radius: 9.5, color: 0xff7700, opacity: 0.5 },
            GlowShell { radius: 12.0, color: 0xff1100, opacity: 0.3 },
        ],
        lights: [
            PointLight { color: 0xffffaa, intensity: 3.0, range: 100.0 },
            PointLight { color: 0xff8800, intensity: 2.0, range: 150.0 },
            PointLight { color: 0xff2200, intensity: 1.0, range: 200.0 },
        ],
    };

    /// Blue-white companion with an orange corona.
    pub const COMPANION: SunBody = SunBody {
        radius: 6.0,
        core_color: 0x00ffff,
        emissive: 0x40a0ff,
        emissive_intensity: 7.0,
        shells: [
            GlowShell { radius: 6.5, color: 0x80ffff, opacity: 0.7 },
            GlowShell { radius: 8.0, color: 0xff6600, opacity: 0.4 },
            GlowShell { radius: 10.0, color: 0xff2200, opacity: 0.3 },
        ],
        lights: [
            PointLight { color: 0x80ffff, intensity: 3.0, range: 100.0 },
            PointLight { color: 0xff6600, intensity: 2.0, range: 150.0 },
            PointLight { color: 0xff2200, intensity: 1.0, range: 200.0 },
        ],
    };

    /// Core disc followed by its shells, innermost first.
    pub fn drawables(&self, center: Vec3) -> impl Iterator<Item = Drawable> + '_ {
        let core = Drawable {
            position: center,
            size: self.radius,
            color: hex_to_rgb(self.emissive),
            intensity: self.emissive_intensity,
            opacity: 1.0,
            layers: LayerMask::BASE_AND_BLOOM,
            shape: Shape::Disc,
        };
        let shells = self.shells.iter().map(move |shell| Drawable {
            position: center,
            size: shell.radius,
            color: hex_to_rgb(shell.color),
            intensity: shell.opacity,
            opacity: shell.opacity,
            layers: LayerMask::BASE_AND_BLOOM,
            shape: Shape::Glow,
        });
        std::iter::once(core).chain(shells)
    }
}

#[derive(Clone, Debug)]
pub struct BinarySystem {
    orbit_radius: f32,
    rotation_speed: f32,
    angle: f32,
    suns: [SunBody; 2],
}

impl BinarySystem {
    pub fn new(config: &BinaryConfig) -> Self {
        Self {
            orbit_radius: config.orbit_radius,
            rotation_speed: config.rotation_speed,
            angle: 0.0,
            suns: [SunBody::PRIMARY, SunBody::COMPANION],
        }
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn suns(&self) -> &[SunBody; 2] {
        &self.suns
    }

    /// Turn the pivot by `rotation_speed` per reference frame.
    pub fn advance(&mut self, frames: f32) {
        self.angle = (self.angle + self.rotation_speed * frames) % std::f32::consts::TAU;
    }

    /// Sun centres in the galaxy's local frame: primary at `+x`, companion at `-x`.
    pub fn sun_positions(&self) -> [Vec3; 2] {
        let pivot = Quat::from_rotation_z(self.angle);
        [
            pivot * Vec3::new(self.orbit_radius, 0.0, 0.0),
            pivot * Vec3::new(-self.orbit_radius, 0.0, 0.0),
        ]
    }

    /// World-space drawables for both suns.
    pub fn drawables(&self, world: Mat4) -> impl Iterator<Item = Drawable> + '_ {
        self.suns
            .iter()
            .zip(self.sun_positions())
            .flat_map(move |(sun, local)| sun.drawables(world.transform_point3(local)))
    }

    /// World-space point lights paired with their positions.
    pub fn lights(&self, world: Mat4) -> Vec<(Vec3, PointLight)> {
        self.suns
            .iter()
            .zip(self.sun_positions())
            .flat_map(|(sun, local)| {
                let center = world.transform_point3(local);
                sun.lights.iter().map(move |light| (center, *light))
            })
            .collect()
    }
}
