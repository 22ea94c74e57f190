//! Read-only per-frame inputs shared by every body.

use galaxy_render::Camera;
use glam::{Mat4, Vec2, Vec3};

/// Snapshot of the host state for one frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext<'a> {
    pub camera: &'a Camera,
    /// Pointer in normalized device coordinates, `None` when outside the window.
    pub pointer: Option<Vec2>,
    /// Wall-clock milliseconds since start.
    pub elapsed_ms: f64,
    /// Time since the previous frame in 60 Hz reference frames.
    pub frames: f32,
    /// Local-to-world transform of the galaxy container.
    pub world: Mat4,
}

impl FrameContext<'_> {
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.world.transform_point3(local)
    }

    /// Camera distance of a world position divided by `scale`.
    pub fn scaled_distance(&self, world: Vec3, scale: f32) -> f32 {
        world.distance(self.camera.position) / scale
    }
}
