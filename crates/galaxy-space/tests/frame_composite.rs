use galaxy_config::Config;
use galaxy_render::{
    Camera, Compositor, CompositorSettings, FrameInputs, FrameOutcome, Projection, SkipReason,
    SoftwareRenderer, Target,
};
use galaxy_space::{Galaxy, RandomSampler};
use glam::{Vec2, Vec3};

const WIDTH: u32 = 96;
const HEIGHT: u32 = 54;

fn camera() -> Camera {
    Camera::looking_at(
        Vec3::new(375.0, 750.0, 750.0),
        Vec3::new(400.0, 0.0, 0.0),
        Vec3::Z,
        Projection {
            fov_y: 30f32.to_radians(),
            aspect_ratio: WIDTH as f32 / HEIGHT as f32,
        },
        0.1,
        5_000_000.0,
    )
}

fn galaxy() -> Galaxy {
    let mut config = Config::default();
    config.galaxy.num_stars = 800;
    Galaxy::generate(&config, &mut RandomSampler::seeded(21)).unwrap()
}

#[test]
fn animated_galaxy_composites_with_alpha() {
    let mut galaxy = galaxy();
    let cam = camera();
    galaxy.update(&cam, Some(Vec2::ZERO), 0.0, 1.0);
    let drawables = galaxy.drawables();

    let compositor = Compositor::new(&CompositorSettings::default(), WIDTH, HEIGHT).unwrap();
    let mut renderer = SoftwareRenderer::new();
    let outcome = compositor
        .render(
            &mut renderer,
            &FrameInputs {
                drawables: &drawables,
                camera: &cam,
                time: 0.0,
            },
        )
        .unwrap();
    assert_eq!(outcome, FrameOutcome::Rendered);

    let frame = renderer.frame();
    assert_eq!((frame.width(), frame.height()), (WIDTH, HEIGHT));
    let lit = frame.pixels().iter().filter(|p| p[3] > 0.0).count();
    assert!(lit > 0, "nothing drawn");

    // Nothing in the galaxy is tagged for the overlay layer.
    let bloom_lit = renderer.target(Target::Bloom).pixels().iter().any(|p| p[0] > 0.0);
    assert!(bloom_lit);
    assert!(renderer.target(Target::Overlay).pixels().iter().all(|p| p[3] == 0.0));
}

#[test]
fn minimised_window_skips_frame() {
    let galaxy = galaxy();
    let cam = camera();
    let drawables = galaxy.drawables();
    let mut compositor = Compositor::new(&CompositorSettings::default(), WIDTH, HEIGHT).unwrap();
    compositor.resize(0, HEIGHT);
    let mut renderer = SoftwareRenderer::new();
    let outcome = compositor
        .render(
            &mut renderer,
            &FrameInputs {
                drawables: &drawables,
                camera: &cam,
                time: 0.0,
            },
        )
        .unwrap();
    assert_eq!(outcome, FrameOutcome::Skipped(SkipReason::ZeroViewport));
}
