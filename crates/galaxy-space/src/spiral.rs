//! Spiral-arm coordinate transform.

use glam::Vec3;

/// Winds a planar sample around the galactic centre.
///
/// A sample `(x, y)` keeps its planar radius `r` and its polar angle is
/// advanced by `spiral * r / arm_x_dist` plus the arm's rotation, so angle
/// grows with radius and each arm traces a continuous curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpiralTransform {
    pub spiral: f32,
    /// Radial length scale of the winding; must be positive.
    pub arm_x_dist: f32,
}

impl SpiralTransform {
    pub fn new(spiral: f32, arm_x_dist: f32) -> Self {
        Self { spiral, arm_x_dist }
    }

    /// Polar angle of a sample after winding.
    pub fn angle(&self, x: f32, y: f32, arm_offset: f32) -> f32 {
        let r = x.hypot(y);
        arm_offset + y.atan2(x) + self.spiral * r / self.arm_x_dist
    }

    pub fn apply(&self, x: f32, y: f32, z: f32, arm_offset: f32) -> Vec3 {
        let r = x.hypot(y);
        let theta = self.angle(x, y, arm_offset);
        Vec3::new(r * theta.cos(), r * theta.sin(), z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{PI, TAU};

    fn wrapped_delta(a: f32, b: f32) -> f32 {
        let mut d = b - a;
        while d > PI {
            d -= TAU;
        }
        while d <= -PI {
            d += TAU;
        }
        d
    }

    #[test]
    fn test_radius_and_height_preserved() {
        let t = SpiralTransform::new(2.0, 100.0);
        let p = t.apply(30.0, 40.0, -7.0, 1.0);
        assert!((p.truncate().length() - 50.0).abs() < 1e-3);
        assert_eq!(p.z, -7.0);
    }

    #[test]
    fn test_zero_spiral_is_rotation_only() {
        let t = SpiralTransform::new(0.0, 100.0);
        let p = t.apply(10.0, 0.0, 0.0, PI / 2.0);
        assert!(p.x.abs() < 1e-5);
        assert!((p.y - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_angle_is_monotonic_in_radius() {
        let t = SpiralTransform::new(2.0, 100.0);
        for offset in [0.0, PI] {
            let mut prev = t.apply(100.0, 100.0, 0.0, offset);
            let mut x = 100.0;
            while x < 600.0 {
                x += 1.0;
                let next = t.apply(x, 100.0, 0.0, offset);
                let d = wrapped_delta(prev.y.atan2(prev.x), next.y.atan2(next.x));
                assert!(d > 0.0, "angle went backwards at x={x}: {d}");
                prev = next;
            }
        }
    }

    #[test]
    fn test_arms_are_rotated_copies() {
        let t = SpiralTransform::new(2.0, 100.0);
        let a = t.apply(200.0, 50.0, 0.0, 0.0);
        let b = t.apply(200.0, 50.0, 0.0, PI);
        assert!((a + b).truncate().length() < 1e-3);
    }
}
