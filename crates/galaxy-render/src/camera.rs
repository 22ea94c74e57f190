//! Perspective camera and world-to-screen projection.
//!
//! Depth is reverse-Z (near plane at 1, far plane at 0), which keeps precision
//! across the very large far plane the galaxy view uses.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    /// Camera-to-world rotation; the camera looks down its local -Z.
    pub rotation: Quat,
    pub projection: Projection,
    /// Distance to the near plane, positive.
    pub near: f32,
    /// Distance to the far plane, greater than `near`.
    pub far: f32,
}

/// Perspective frustum shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Viewport width over height.
    pub aspect_ratio: f32,
}

/// A world-space point after projection through the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    /// Normalized device coordinates. `x` and `y` are in [-1, 1] when on screen.
    pub ndc: Vec3,
    /// How many NDC units (vertically) one world unit spans at this depth.
    pub ndc_per_unit: f32,
}

/// Camera data uploaded to billboard shaders.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    /// World-space right vector, w unused.
    pub right: [f32; 4],
    /// World-space up vector, w unused.
    pub up: [f32; 4],
}

impl Camera {
    /// Camera at `position` facing `target`, rolled so `up` stays up.
    pub fn looking_at(
        position: Vec3,
        target: Vec3,
        up: Vec3,
        projection: Projection,
        near: f32,
        far: f32,
    ) -> Self {
        let world_from_camera = Mat4::look_at_rh(position, target, up).inverse();
        Self {
            position,
            rotation: Quat::from_mat4(&world_from_camera).normalize(),
            projection,
            near,
            far,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), self.up())
    }

    /// Reverse-Z perspective: the far and near arguments are swapped.
    pub fn projection_matrix(&self) -> Mat4 {
        let Projection {
            fov_y,
            aspect_ratio,
        } = self.projection;
        Mat4::perspective_rh(fov_y, aspect_ratio, self.far, self.near)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Match a new viewport. A zero height (minimised window) leaves the
    /// aspect ratio alone.
    pub fn set_aspect_ratio(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.projection.aspect_ratio = width / height;
        }
    }

    /// Project a world-space point to normalized device coordinates.
    ///
    /// Returns `None` for points at or behind the camera plane.
    pub fn project(&self, world: Vec3) -> Option<ProjectedPoint> {
        let proj = self.projection_matrix();
        let clip = proj * self.view_matrix() * Vec4::new(world.x, world.y, world.z, 1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        Some(ProjectedPoint {
            ndc: clip.truncate() / clip.w,
            ndc_per_unit: proj.y_axis.y / clip.w,
        })
    }

    /// Screen position only.
    pub fn project_to_ndc(&self, world: Vec3) -> Option<Vec2> {
        self.project(world).map(|p| p.ndc.truncate())
    }

    pub fn to_uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: self.view_projection_matrix().to_cols_array_2d(),
            right: self.right().extend(0.0).to_array(),
            up: self.up().extend(0.0).to_array(),
        }
    }
}

impl Default for Camera {
    /// At the origin looking down -Z, 45° vertical field of view, 16:9.
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            projection: Projection {
                fov_y: std::f32::consts::FRAC_PI_4,
                aspect_ratio: 16.0 / 9.0,
            },
            near: 0.1,
            far: 10_000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn galaxy_camera() -> Camera {
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
    fn test_default_camera_faces_neg_z() {
        assert!((Camera::default().forward() - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn test_looking_at_points_forward_at_target() {
        let camera = galaxy_camera();
        let expected = (Vec3::new(400.0, 0.0, 0.0) - camera.position).normalize();
        assert!((camera.forward() - expected).length() < 1e-4);
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let camera = galaxy_camera();
        let ndc = camera.project_to_ndc(Vec3::new(400.0, 0.0, 0.0)).unwrap();
        assert!(ndc.length() < 1e-3, "target should be centered, got {ndc:?}");
    }

    #[test]
    fn test_near_points_have_larger_depth_than_far() {
        let camera = Camera::default();
        let near = camera.project(Vec3::new(0.0, 0.0, -1.0)).unwrap();
        let far = camera.project(Vec3::new(0.0, 0.0, -1000.0)).unwrap();
        assert!(near.ndc.z > far.ndc.z);
    }

    #[test]
    fn test_point_behind_camera_does_not_project() {
        let camera = galaxy_camera();
        let behind = camera.position - camera.forward() * 100.0;
        assert!(camera.project(behind).is_none());
    }

    #[test]
    fn test_ndc_scale_shrinks_with_distance() {
        let camera = Camera::default();
        let near = camera.project(Vec3::new(0.0, 0.0, -10.0)).unwrap();
        let far = camera.project(Vec3::new(0.0, 0.0, -100.0)).unwrap();
        assert!((near.ndc_per_unit / far.ndc_per_unit - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_aspect_ratio_follows_viewport() {
        let mut camera = Camera::default();
        camera.set_aspect_ratio(1000.0, 500.0);
        assert!((camera.projection.aspect_ratio - 2.0).abs() < 1e-6);
        camera.set_aspect_ratio(800.0, 0.0);
        assert!((camera.projection.aspect_ratio - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_wider_viewport_squeezes_x() {
        let mut camera = Camera::default();
        let point = Vec3::new(1.0, 1.0, -10.0);
        camera.set_aspect_ratio(1.0, 1.0);
        let square = camera.project_to_ndc(point).unwrap();
        camera.set_aspect_ratio(2.0, 1.0);
        let wide = camera.project_to_ndc(point).unwrap();
        assert!((wide.x * 2.0 - square.x).abs() < 1e-5);
        assert!((wide.y - square.y).abs() < 1e-5);
    }

    #[test]
    fn test_view_matrix_places_camera_at_origin() {
        let camera = Camera {
            position: Vec3::new(10.0, 20.0, 30.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            ..Camera::default()
        };
        let origin = camera.view_matrix().transform_point3(camera.position);
        assert!(origin.length() < 1e-4);
    }

    #[test]
    fn test_basis_is_orthonormal() {
        let camera = galaxy_camera();
        let (f, u, r) = (camera.forward(), camera.up(), camera.right());
        for v in [f, u, r] {
            assert!((v.length() - 1.0).abs() < 1e-5);
        }
        assert!(f.dot(u).abs() < 1e-5);
        assert!(f.dot(r).abs() < 1e-5);
        assert!(u.dot(r).abs() < 1e-5);
    }

    #[test]
    fn test_camera_uniform_size() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 96);
    }
}
