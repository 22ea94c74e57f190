//! Twinkling stars.
//!
//! Each star owns its oscillators and hover state. [`Star::animate`] is a pure
//! function of the star and the frame; [`Star::update`] commits the result.
//! Stars render only into the bloom layer.

use galaxy_config::StarConfig;
use galaxy_render::{Drawable, LayerMask, Shape};
use glam::Vec3;

use crate::context::FrameContext;
use crate::oscillator::{Oscillator, twinkle_set};
use crate::sampler::RandomSampler;
use crate::star_types::StarTypeTable;

/// Emissive intensity of a star nobody is pointing at.
pub const BASE_EMISSIVE: f32 = 2.0;
/// Extra emissive intensity at full hover.
pub const HOVER_EMISSIVE: f32 = 50.0;
/// Opacity added per unit of hover brightness, before the multiplier.
pub const HOVER_OPACITY_GAIN: f32 = 10.0;
/// Upper bound of the per-star time offset, in milliseconds.
pub const TIME_OFFSET_SPAN: f32 = 1000.0;

/// Pointer-proximity brightness, low-pass filtered toward its target.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Hover {
    pub brightness: f32,
    pub target: f32,
}

impl Hover {
    /// Move toward `target`. One reference frame closes `blend` of the gap;
    /// fractional frames compound so the rate is frame-rate independent.
    pub fn integrate(self, target: f32, blend: f32, frames: f32) -> Self {
        let step = 1.0 - (1.0 - blend.clamp(0.0, 1.0)).powf(frames.max(0.0));
        Self {
            brightness: self.brightness + (target - self.brightness) * step,
            target,
        }
    }
}

/// Hover target for a pointer at NDC distance `distance`.
pub fn hover_target(distance: f32, radius: f32) -> f32 {
    if distance < radius {
        1.0 - distance / radius
    } else {
        0.0
    }
}

/// Everything one frame changes about a star.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StarAnimation {
    pub oscillators: [Oscillator; 3],
    pub hover: Hover,
    pub world: Vec3,
    /// Distance-scaled size before twinkle.
    pub base_size: f32,
    pub size: f32,
    /// Clamped opacity; above 1 it acts as intensity.
    pub opacity: f32,
    pub emissive: f32,
}

#[derive(Clone, Debug)]
pub struct Star {
    local: Vec3,
    star_type: usize,
    color: [f32; 3],
    size_class: f32,
    size_variation: f32,
    oscillators: [Oscillator; 3],
    time_offset: f32,
    opacity_multiplier: f32,
    opacity_speed: f32,
    hover: Hover,
    sprite: Option<Drawable>,
}

impl Star {
    /// A star at `local` with randomized class and animation parameters.
    pub fn new(local: Vec3, table: &StarTypeTable, sampler: &mut RandomSampler) -> Self {
        let star_type = table.sample(sampler);
        let (color, size_class) = table
            .get(star_type)
            .map(|t| (t.color, t.size))
            .unwrap_or(([1.0; 3], 1.0));
        Self {
            local,
            star_type,
            color,
            size_class,
            size_variation: sampler.uniform_range(0.7, 1.3),
            oscillators: twinkle_set(sampler),
            time_offset: sampler.uniform() * TIME_OFFSET_SPAN,
            opacity_multiplier: sampler.uniform_range(0.8, 1.2),
            opacity_speed: sampler.uniform_range(0.5, 2.0),
            hover: Hover::default(),
            sprite: None,
        }
    }

    pub fn local_position(&self) -> Vec3 {
        self.local
    }

    pub fn star_type(&self) -> usize {
        self.star_type
    }

    pub fn hover(&self) -> Hover {
        self.hover
    }

    pub fn oscillators(&self) -> &[Oscillator; 3] {
        &self.oscillators
    }

    pub fn sprite(&self) -> Option<&Drawable> {
        self.sprite.as_ref()
    }

    pub fn is_realized(&self) -> bool {
        self.sprite.is_some()
    }

    /// Attach the bloom-layer sprite. Idempotent.
    pub fn realize(&mut self) -> &Drawable {
        let (local, color, size) = (self.local, self.color, self.size_class);
        self.sprite.get_or_insert_with(|| Drawable {
            position: local,
            size,
            color,
            intensity: 1.0,
            opacity: 1.0,
            layers: LayerMask::BLOOM,
            shape: Shape::Sprite,
        })
    }

    /// Per-star distance multiplier in `[0.4, 1.2]`, fixed for its lifetime.
    fn distance_variation(&self) -> f32 {
        0.8 + (self.time_offset * 0.01).sin() * 0.4
    }

    /// Size from scaled camera distance, clamped to the configured bounds.
    pub fn base_size(&self, scaled_distance: f32, config: &StarConfig) -> f32 {
        let dist = scaled_distance * self.distance_variation();
        (dist * self.size_class * self.size_variation).clamp(config.min_size, config.max_size)
    }

    pub fn animate(&self, ctx: &FrameContext<'_>, config: &StarConfig) -> StarAnimation {
        let world = ctx.to_world(self.local);
        let base_size = self.base_size(ctx.scaled_distance(world, config.distance_scale), config);

        let oscillators = self.oscillators.map(|o| o.advanced(ctx.frames));
        let [p1, p2, p3] = oscillators.map(|o| o.phase);

        let offset = self.time_offset as f64;
        let t = ctx.elapsed_ms + offset;
        let noise = ((t * 0.001 + offset).sin() * 0.1 + (t * 0.003 + offset * 2.0).sin() * 0.05) as f32;
        let twinkle = 1.0 + oscillators.iter().map(Oscillator::value).sum::<f32>() + noise;
        let size = base_size * twinkle.max(0.0);

        let hover = if self.is_realized() {
            let target = ctx
                .pointer
                .zip(ctx.camera.project_to_ndc(world))
                .map_or(0.0, |(pointer, ndc)| {
                    hover_target(pointer.distance(ndc), config.hover_radius)
                });
            self.hover.integrate(target, config.hover_blend, ctx.frames)
        } else {
            self.hover
        };

        let s = self.opacity_speed;
        let off = self.time_offset;
        let raw = 0.85
            + (p1 * s).sin() * 0.1
            + (p2 * s * 0.8).sin() * 0.08
            + (p3 * s * 1.2).sin() * 0.06
            + (p1 * 1.8 + off).sin() * 0.04
            + (p2 * 2.5 + off * 1.5).sin() * 0.03;
        let opacity = ((raw + hover.brightness * HOVER_OPACITY_GAIN) * self.opacity_multiplier)
            .clamp(config.min_opacity, config.max_opacity);

        StarAnimation {
            oscillators,
            hover,
            world,
            base_size,
            size,
            opacity,
            emissive: BASE_EMISSIVE + hover.brightness * HOVER_EMISSIVE,
        }
    }

    /// Commit an animation. Phases always advance; the sprite and hover
    /// state only change once the star is realized.
    pub fn apply(&mut self, anim: &StarAnimation) {
        self.oscillators = anim.oscillators;
        let Some(sprite) = self.sprite.as_mut() else {
            return;
        };
        self.hover = anim.hover;
        sprite.position = anim.world;
        sprite.size = anim.size;
        sprite.opacity = anim.opacity.min(1.0);
        sprite.intensity = anim.opacity * anim.emissive / BASE_EMISSIVE;
    }

    pub fn update(&mut self, ctx: &FrameContext<'_>, config: &StarConfig) -> StarAnimation {
        let anim = self.animate(ctx, config);
        self.apply(&anim);
        anim
    }
}
