//! Per-frame orchestration.
//!
//! Animation constants are expressed per reference frame at 60 Hz, so the
//! clock converts wall time into a fractional frame count. Each frame updates
//! every body first and only then runs the compositor passes.

use std::time::Instant;

use galaxy_config::Config;
use galaxy_render::{
    Camera, Compositor, CompositorSettings, Drawable, FrameInputs, FrameOutcome, PassExecutor,
    RenderError,
};
use galaxy_space::{Galaxy, GalaxyError, RandomSampler, UpdateStats};
use glam::Vec2;
use tracing::warn;

use crate::scene;

/// Rate the per-frame animation constants were tuned for.
pub const REFERENCE_RATE: f64 = 60.0;

/// Longest frame the clock will report. Stalls beyond this slow the animation
/// down instead of jumping it forward.
pub const MAX_FRAME_TIME: f64 = 0.25;

/// Time handed to one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTick {
    /// Milliseconds since the clock started.
    pub elapsed_ms: f64,
    /// Reference frames covered by this tick.
    pub frames: f32,
}

/// Converts wall-clock frame times into [`FrameTick`]s.
#[derive(Clone, Debug)]
pub struct FrameClock {
    previous: Instant,
    elapsed: f64,
    frame_count: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            previous: Instant::now(),
            elapsed: 0.0,
            frame_count: 0,
        }
    }

    /// Measure the time since the last tick and advance by it.
    pub fn tick(&mut self) -> FrameTick {
        let now = Instant::now();
        let frame_time = now.duration_since(self.previous).as_secs_f64();
        self.previous = now;
        self.advance(frame_time)
    }

    /// Advance by an explicit frame time in seconds.
    pub fn advance(&mut self, frame_time: f64) -> FrameTick {
        let mut frame_time = frame_time.max(0.0);
        if frame_time > MAX_FRAME_TIME {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                frame_time * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
            frame_time = MAX_FRAME_TIME;
        }
        self.elapsed += frame_time;
        self.frame_count += 1;
        FrameTick {
            elapsed_ms: self.elapsed * 1000.0,
            frames: (frame_time * REFERENCE_RATE) as f32,
        }
    }

    /// Seconds accumulated so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the galaxy, the camera and the compositor plan, and drives them one
/// frame at a time against any [`PassExecutor`].
pub struct FrameDriver {
    galaxy: Galaxy,
    camera: Camera,
    compositor: Compositor,
    clock: FrameClock,
    drawables: Vec<Drawable>,
    stats: UpdateStats,
}

impl FrameDriver {
    pub fn new(galaxy: Galaxy, camera: Camera, compositor: Compositor) -> Self {
        Self {
            galaxy,
            camera,
            compositor,
            clock: FrameClock::new(),
            drawables: Vec::new(),
            stats: UpdateStats::default(),
        }
    }

    /// Generate a galaxy and build camera and compositor for a `width` x
    /// `height` viewport.
    pub fn from_config(config: &Config, width: u32, height: u32) -> Result<Self, DriverError> {
        let galaxy = generate_galaxy(config)?;
        let camera = scene::camera(&config.camera, width, height);
        let compositor = Compositor::new(&scene::compositor_settings(config), width, height)?;
        Ok(Self::new(galaxy, camera, compositor))
    }

    pub fn galaxy(&self) -> &Galaxy {
        &self.galaxy
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Counters from the most recent update.
    pub fn stats(&self) -> UpdateStats {
        self.stats
    }

    /// Drawables collected by the most recent update.
    pub fn drawables(&self) -> &[Drawable] {
        &self.drawables
    }

    /// Track a new viewport. A zero-sized viewport is kept as-is so the next
    /// frame is skipped.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_aspect_ratio(width as f32, height as f32);
        self.compositor.resize(width, height);
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    pub fn set_settings(&mut self, settings: &CompositorSettings) -> Result<(), RenderError> {
        self.compositor.set_settings(settings)
    }

    /// Swap in a freshly generated galaxy, keeping camera and compositor.
    pub fn regenerate(&mut self, config: &Config) -> Result<(), GalaxyError> {
        self.galaxy = generate_galaxy(config)?;
        Ok(())
    }

    /// Update every body for `tick` and collect this frame's drawables.
    pub fn advance(&mut self, tick: FrameTick, pointer: Option<Vec2>) -> UpdateStats {
        self.stats = self
            .galaxy
            .update(&self.camera, pointer, tick.elapsed_ms, tick.frames);
        self.drawables.clear();
        self.galaxy.collect_drawables(&mut self.drawables);
        self.stats
    }

    /// Run the compositor over the drawables collected by [`advance`](Self::advance).
    pub fn render<E: PassExecutor + ?Sized>(
        &self,
        executor: &mut E,
    ) -> Result<FrameOutcome, RenderError> {
        self.compositor.render(
            executor,
            &FrameInputs {
                drawables: &self.drawables,
                camera: &self.camera,
                time: self.clock.elapsed() as f32,
            },
        )
    }

    /// One frame with an explicit tick: update, then render.
    pub fn step<E: PassExecutor + ?Sized>(
        &mut self,
        executor: &mut E,
        pointer: Option<Vec2>,
        tick: FrameTick,
    ) -> Result<FrameOutcome, RenderError> {
        self.advance(tick, pointer);
        self.render(executor)
    }

    /// One frame timed against the wall clock.
    pub fn frame<E: PassExecutor + ?Sized>(
        &mut self,
        executor: &mut E,
        pointer: Option<Vec2>,
    ) -> Result<FrameOutcome, RenderError> {
        let tick = self.clock.tick();
        self.step(executor, pointer, tick)
    }

    /// One frame of exactly one reference frame, independent of wall time.
    pub fn fixed_step<E: PassExecutor + ?Sized>(
        &mut self,
        executor: &mut E,
        pointer: Option<Vec2>,
    ) -> Result<FrameOutcome, RenderError> {
        let tick = self.clock.advance(1.0 / REFERENCE_RATE);
        self.step(executor, pointer, tick)
    }
}

fn generate_galaxy(config: &Config) -> Result<Galaxy, GalaxyError> {
    let mut sampler = RandomSampler::new(config.galaxy.seed);
    Galaxy::generate(config, &mut sampler)
}

/// Errors building a [`FrameDriver`].
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Galaxy(#[from] GalaxyError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use galaxy_render::{Pass, SkipReason};

    /// Records pass labels instead of drawing.
    #[derive(Default)]
    struct Recorder {
        labels: Vec<&'static str>,
        drawables_seen: usize,
    }

    impl PassExecutor for Recorder {
        fn prepare(&mut self, _width: u32, _height: u32) -> Result<(), RenderError> {
            Ok(())
        }

        fn execute(&mut self, pass: &Pass, inputs: &FrameInputs<'_>) -> Result<(), RenderError> {
            self.labels.push(pass.label);
            self.drawables_seen = inputs.drawables.len();
            Ok(())
        }
    }

    fn small_config() -> Config {
        let mut config = Config::default();
        config.galaxy.num_stars = 200;
        config.galaxy.seed = Some(9);
        config
    }

    #[test]
    fn test_clock_converts_seconds_to_reference_frames() {
        let mut clock = FrameClock::new();
        let tick = clock.advance(1.0 / 60.0);
        assert!((tick.frames - 1.0).abs() < 1e-5);
        let tick = clock.advance(1.0 / 30.0);
        assert!((tick.frames - 2.0).abs() < 1e-5);
        assert!((tick.elapsed_ms - 50.0).abs() < 1e-6);
        assert_eq!(clock.frame_count(), 2);
    }

    #[test]
    fn test_clock_clamps_long_frames() {
        let mut clock = FrameClock::new();
        let tick = clock.advance(3.0);
        assert!((tick.frames as f64 - MAX_FRAME_TIME * REFERENCE_RATE).abs() < 1e-4);
        assert!((clock.elapsed() - MAX_FRAME_TIME).abs() < 1e-12);
    }

    #[test]
    fn test_clock_ignores_negative_time() {
        let mut clock = FrameClock::new();
        let tick = clock.advance(-1.0);
        assert_eq!(tick.frames, 0.0);
        assert_eq!(tick.elapsed_ms, 0.0);
    }

    #[test]
    fn test_bodies_update_before_passes_run() {
        let mut driver = FrameDriver::from_config(&small_config(), 64, 36).unwrap();
        assert!(driver.drawables().is_empty());
        let mut recorder = Recorder::default();
        let outcome = driver.fixed_step(&mut recorder, None).unwrap();
        assert_eq!(outcome, FrameOutcome::Rendered);
        assert_eq!(recorder.drawables_seen, driver.drawables().len());
        assert!(recorder.drawables_seen > 0);
        assert_eq!(driver.stats().stars, driver.galaxy().stars().len());
    }

    #[test]
    fn test_pass_order_repeats_every_frame() {
        let mut driver = FrameDriver::from_config(&small_config(), 64, 36).unwrap();
        let mut recorder = Recorder::default();
        driver.fixed_step(&mut recorder, None).unwrap();
        let first = recorder.labels.clone();
        recorder.labels.clear();
        driver.fixed_step(&mut recorder, Some(Vec2::ZERO)).unwrap();
        assert_eq!(first, recorder.labels);
        let expected: Vec<&str> = driver
            .compositor()
            .plan()
            .passes()
            .iter()
            .map(|p| p.label)
            .collect();
        assert_eq!(first, expected);
    }

    #[test]
    fn test_resize_to_zero_skips_and_recovers() {
        let mut driver = FrameDriver::from_config(&small_config(), 64, 36).unwrap();
        let mut recorder = Recorder::default();
        driver.resize(0, 0);
        assert_eq!(
            driver.fixed_step(&mut recorder, None).unwrap(),
            FrameOutcome::Skipped(SkipReason::ZeroViewport)
        );
        assert!(recorder.labels.is_empty());
        driver.resize(64, 36);
        assert_eq!(
            driver.fixed_step(&mut recorder, None).unwrap(),
            FrameOutcome::Rendered
        );
    }

    #[test]
    fn test_spin_follows_reference_frames() {
        let mut driver = FrameDriver::from_config(&small_config(), 64, 36).unwrap();
        let mut recorder = Recorder::default();
        for _ in 0..10 {
            driver.fixed_step(&mut recorder, None).unwrap();
        }
        assert!((driver.galaxy().spin() + 0.01).abs() < 1e-5);
    }

    #[test]
    fn test_regenerate_uses_new_star_count() {
        let mut config = small_config();
        let mut driver = FrameDriver::from_config(&config, 64, 36).unwrap();
        let before = driver.galaxy().stars().len();
        config.galaxy.num_stars = 400;
        driver.regenerate(&config).unwrap();
        assert!(driver.galaxy().stars().len() > before);
    }
}
