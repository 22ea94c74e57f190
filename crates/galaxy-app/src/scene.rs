//! Config sections mapped onto renderer types.

use galaxy_config::{CameraConfig, Config};
use galaxy_render::{
    AberrationParams, BloomConfig, Camera, CompositorSettings, GrainParams, Projection,
};
use glam::Vec3;

/// Perspective camera for a `width` x `height` viewport.
pub fn camera(config: &CameraConfig, width: u32, height: u32) -> Camera {
    let aspect_ratio = if height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    };
    Camera::looking_at(
        Vec3::from_array(config.position),
        Vec3::from_array(config.target),
        Vec3::from_array(config.up),
        Projection {
            fov_y: config.fov_y_degrees.to_radians(),
            aspect_ratio,
        },
        config.near,
        config.far,
    )
}

/// Pass plan knobs from the `render` section. Disabled cosmetics are left
/// out of the plan entirely.
pub fn compositor_settings(config: &Config) -> CompositorSettings {
    let render = &config.render;
    CompositorSettings {
        bloom: BloomConfig {
            threshold: render.bloom.threshold,
            strength: render.bloom.strength,
            radius: render.bloom.radius,
            levels: render.bloom.levels,
            ..BloomConfig::default()
        },
        aberration: render.post.chromatic_aberration.then(|| AberrationParams {
            offset: render.post.aberration_offset,
            intensity: render.post.aberration_intensity,
        }),
        grain: render.post.vintage_grain.then(|| GrainParams {
            grain_intensity: render.post.grain_intensity,
            color_shift: render.post.color_shift,
        }),
        exposure: render.exposure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galaxy_render::Program;

    #[test]
    fn test_default_camera_frames_galaxy() {
        let cam = camera(&CameraConfig::default(), 1280, 720);
        let ndc = cam.project_to_ndc(Vec3::new(400.0, 0.0, 0.0)).unwrap();
        assert!(ndc.length() < 1e-3);
        let Projection {
            aspect_ratio,
            fov_y,
        } = cam.projection;
        assert!((aspect_ratio - 1280.0 / 720.0).abs() < 1e-6);
        assert!((fov_y - 30f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn test_zero_height_camera_is_finite() {
        let cam = camera(&CameraConfig::default(), 0, 0);
        assert!(cam.projection_matrix().is_finite());
    }

    #[test]
    fn test_defaults_leave_cosmetics_out() {
        let settings = compositor_settings(&Config::default());
        assert!(settings.aberration.is_none());
        assert!(settings.grain.is_none());
        assert_eq!(settings.exposure, 0.5);
        assert_eq!(settings.bloom.threshold, 0.5);
        assert_eq!(settings.bloom.strength, 1.5);
        assert_eq!(settings.bloom.radius, 0.4);
    }

    #[test]
    fn test_enabled_cosmetics_join_the_plan() {
        let mut config = Config::default();
        config.render.post.chromatic_aberration = true;
        config.render.post.vintage_grain = true;
        let settings = compositor_settings(&config);
        assert_eq!(
            settings.aberration,
            Some(AberrationParams {
                offset: 0.002,
                intensity: 1.0
            })
        );
        let plan = galaxy_render::FramePlan::layered(&settings);
        assert!(
            plan.passes()
                .iter()
                .any(|p| matches!(p.program, Program::VintageGrain(_)))
        );
    }
}
