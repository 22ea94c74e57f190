//! Bloom filter for the bloom layer.
//!
//! Bright pixels are extracted with a soft-knee threshold, blurred across a
//! chain of half-resolution levels, and recombined with per-level weights
//! that `radius` pushes toward the wider levels. The result replaces the
//! bloom layer's contents before the merge.
//!
//! Two implementations share the parameters: [`apply_bloom`] on the CPU for
//! headless snapshots, and [`BloomPipeline`] on the GPU.

use bytemuck::{Pod, Zeroable};

use crate::image::{HdrImage, Rgba, luminance};
use crate::post::RenderTarget;

/// Bloom parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct BloomConfig {
    /// Luminance above which pixels contribute.
    pub threshold: f32,
    /// Width of the soft transition below the threshold.
    pub soft_knee: f32,
    /// Multiplier on the recombined glow.
    pub strength: f32,
    /// In [0, 1]. 0 favours the sharp levels, 1 the wide ones.
    pub radius: f32,
    /// Number of blur levels, in [1, 8].
    pub levels: u32,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            soft_knee: 0.1,
            strength: 1.5,
            radius: 0.4,
            levels: 5,
        }
    }
}

/// Uniform for one GPU bloom pass.
///
/// Every pass sees the threshold. Blur passes read `blur_step`, combine
/// passes read `level_weight`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub(crate) struct BloomParams {
    pub threshold: f32,
    pub soft_knee: f32,
    pub level_weight: f32,
    pub _pad: f32,
    /// Texel step of a blur pass: `[1, 0]` horizontal, `[0, 1]` vertical.
    pub blur_step: [f32; 2],
    pub _pad2: [f32; 2],
}

const HORIZONTAL_SLOT: usize = 0;
const VERTICAL_SLOT: usize = 1;
const FIRST_LEVEL_SLOT: usize = 2;

/// Uniform table for `config`: horizontal blur, vertical blur, then one
/// combine entry per level.
pub(crate) fn bloom_uniforms(config: &BloomConfig) -> Vec<BloomParams> {
    let base = BloomParams {
        threshold: config.threshold,
        soft_knee: config.soft_knee,
        ..BloomParams::default()
    };
    let mut table = vec![
        BloomParams {
            blur_step: [1.0, 0.0],
            ..base
        },
        BloomParams {
            blur_step: [0.0, 1.0],
            ..base
        },
    ];
    table.extend(combine_weights(config).into_iter().map(|weight| BloomParams {
        level_weight: weight,
        ..base
    }));
    table
}

/// 9-tap Gaussian weights for sigma ≈ 1.5 (center first, normalized).
pub const GAUSSIAN_WEIGHTS: [f32; 5] = [
    0.227_027_03,
    0.194_594_6,
    0.121_621_62,
    0.054_054_055,
    0.016_216_216,
];

/// Scale applied to an extracted colour. Zero at or below `threshold - knee`.
pub fn soft_threshold_factor(luma: f32, threshold: f32, knee: f32) -> f32 {
    let soft = (luma - threshold + knee).clamp(0.0, 2.0 * knee);
    let contribution = soft * soft / (4.0 * knee + 0.0001);
    ((luma - threshold).max(contribution) / luma.max(0.0001)).max(0.0)
}

/// Recombination weight of blur level `level`.
pub fn level_weight(level: u32, radius: f32) -> f32 {
    let factor = (1.0 - 0.2 * level as f32).max(0.0);
    factor + ((1.2 - factor) - factor) * radius
}

/// Final per-level multipliers: [`level_weight`] scaled by `strength`.
pub fn combine_weights(config: &BloomConfig) -> Vec<f32> {
    (0..config.levels)
        .map(|level| level_weight(level, config.radius) * config.strength)
        .collect()
}

fn extract(src: &HdrImage, config: &BloomConfig) -> HdrImage {
    let mut out = HdrImage::new(src.width(), src.height());
    for (dst, px) in out.pixels_mut().iter_mut().zip(src.pixels()) {
        let factor = soft_threshold_factor(luminance(px), config.threshold, config.soft_knee);
        if factor > 0.0 {
            *dst = [px[0] * factor, px[1] * factor, px[2] * factor, px[3]];
        }
    }
    out
}

fn downsample(src: &HdrImage) -> HdrImage {
    let w = (src.width() / 2).max(1);
    let h = (src.height() / 2).max(1);
    let mut out = HdrImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let (sx, sy) = (x as i64 * 2, y as i64 * 2);
            let taps = [
                src.get_clamped(sx, sy),
                src.get_clamped(sx + 1, sy),
                src.get_clamped(sx, sy + 1),
                src.get_clamped(sx + 1, sy + 1),
            ];
            let avg: Rgba = std::array::from_fn(|i| taps.iter().map(|t| t[i]).sum::<f32>() * 0.25);
            out.set(x, y, avg);
        }
    }
    out
}

fn blur_axis(src: &HdrImage, horizontal: bool) -> HdrImage {
    let mut out = HdrImage::new(src.width(), src.height());
    for y in 0..src.height() {
        for x in 0..src.width() {
            let mut acc = [0.0f32; 4];
            for (offset, weight) in GAUSSIAN_WEIGHTS.iter().enumerate() {
                let taps: &[i64] = if offset == 0 {
                    &[0]
                } else {
                    &[offset as i64, -(offset as i64)]
                };
                for &d in taps {
                    let (tx, ty) = if horizontal {
                        (x as i64 + d, y as i64)
                    } else {
                        (x as i64, y as i64 + d)
                    };
                    let px = src.get_clamped(tx, ty);
                    for i in 0..4 {
                        acc[i] += px[i] * weight;
                    }
                }
            }
            out.set(x, y, acc);
        }
    }
    out
}

/// Run the bloom filter on the CPU and return the glow image.
///
/// Alpha is treated like colour, so the glow carries coverage that the merge
/// can combine with the base layer's alpha.
pub fn apply_bloom(src: &HdrImage, config: &BloomConfig) -> HdrImage {
    let mut out = HdrImage::new(src.width(), src.height());
    if src.width() == 0 || src.height() == 0 || config.levels == 0 {
        return out;
    }

    let mut level_src = extract(src, config);
    let mut blurred = Vec::with_capacity(config.levels as usize);
    for _ in 0..config.levels {
        level_src = downsample(&level_src);
        let level = blur_axis(&blur_axis(&level_src, true), false);
        blurred.push(level);
    }

    let (w, h) = (src.width() as f32, src.height() as f32);
    let weights = combine_weights(config);
    for y in 0..src.height() {
        for x in 0..src.width() {
            let u = (x as f32 + 0.5) / w;
            let v = (y as f32 + 0.5) / h;
            let mut acc = [0.0f32; 4];
            for (level, weight) in blurred.iter().zip(&weights) {
                let s = level.sample(u, v);
                for i in 0..4 {
                    acc[i] += s[i] * weight;
                }
            }
            acc[3] = acc[3].clamp(0.0, 1.0);
            out.set(x, y, acc);
        }
    }
    out
}

/// WGSL for the GPU bloom chain. Each step mirrors [`apply_bloom`]: the
/// extract pass thresholds and halves, the downsample pass box-filters 2x2,
/// blur passes apply [`GAUSSIAN_WEIGHTS`] along one axis, combine passes add
/// each level with its weight, and resolve clamps alpha.
pub const BLOOM_SHADER_SOURCE: &str = r#"
struct BloomParams {
    threshold: f32,
    soft_knee: f32,
    level_weight: f32,
    _pad: f32,
    blur_step: vec2<f32>,
    _pad2: vec2<f32>,
};

const GAUSSIAN_WEIGHTS = array<f32, 5>(0.22702703, 0.1945946, 0.12162162, 0.054054055, 0.016216216);

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0) var<uniform> params: BloomParams;
@group(1) @binding(0) var input_tex: texture_2d<f32>;
@group(1) @binding(1) var input_sampler: sampler;

@vertex
fn vs_fullscreen(@builtin(vertex_index) idx: u32) -> VertexOutput {
    let corner = vec2<f32>(f32((idx << 1u) & 2u), f32(idx & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(corner * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(corner.x, 1.0 - corner.y);
    return out;
}

fn load_clamped(p: vec2<i32>) -> vec4<f32> {
    let last = vec2<i32>(textureDimensions(input_tex)) - vec2<i32>(1);
    return textureLoad(input_tex, clamp(p, vec2<i32>(0), last), 0);
}

fn threshold_factor(luma: f32) -> f32 {
    let knee = params.soft_knee;
    let soft = clamp(luma - params.threshold + knee, 0.0, 2.0 * knee);
    let contribution = soft * soft / (4.0 * knee + 0.0001);
    return max(max(luma - params.threshold, contribution) / max(luma, 0.0001), 0.0);
}

fn extracted(p: vec2<i32>) -> vec4<f32> {
    let src = load_clamped(p);
    let factor = threshold_factor(dot(src.rgb, vec3<f32>(0.2126, 0.7152, 0.0722)));
    return select(vec4<f32>(0.0), vec4<f32>(src.rgb * factor, src.a), factor > 0.0);
}

fn texel_coord(position: vec4<f32>) -> vec2<i32> {
    return vec2<i32>(floor(position.xy));
}

@fragment
fn fs_extract(in: VertexOutput) -> @location(0) vec4<f32> {
    let p = texel_coord(in.position) * 2;
    let sum = extracted(p) + extracted(p + vec2<i32>(1, 0))
        + extracted(p + vec2<i32>(0, 1)) + extracted(p + vec2<i32>(1, 1));
    return sum * 0.25;
}

@fragment
fn fs_downsample(in: VertexOutput) -> @location(0) vec4<f32> {
    let p = texel_coord(in.position) * 2;
    let sum = load_clamped(p) + load_clamped(p + vec2<i32>(1, 0))
        + load_clamped(p + vec2<i32>(0, 1)) + load_clamped(p + vec2<i32>(1, 1));
    return sum * 0.25;
}

@fragment
fn fs_blur(in: VertexOutput) -> @location(0) vec4<f32> {
    let p = texel_coord(in.position);
    let dir = vec2<i32>(params.blur_step);
    var weights = GAUSSIAN_WEIGHTS;
    var acc = load_clamped(p) * weights[0];
    for (var i = 1; i < 5; i++) {
        acc += (load_clamped(p + dir * i) + load_clamped(p - dir * i)) * weights[i];
    }
    return acc;
}

@fragment
fn fs_combine(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(input_tex, input_sampler, in.uv) * params.level_weight;
}

@fragment
fn fs_resolve(in: VertexOutput) -> @location(0) vec4<f32> {
    let glow = load_clamped(texel_coord(in.position));
    return vec4<f32>(glow.rgb, clamp(glow.a, 0.0, 1.0));
}
"#;

/// Plain sum on every channel, alpha included.
const SUM_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

struct ParamSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Render targets of the chain for one viewport size.
struct BloomTargets {
    /// Level `i` is `1 / 2^(i + 1)` of the viewport; blurred in place.
    levels: Vec<RenderTarget>,
    level_groups: Vec<wgpu::BindGroup>,
    /// Holds the horizontal blur of the matching level.
    scratch: Vec<RenderTarget>,
    scratch_groups: Vec<wgpu::BindGroup>,
    /// Full-size sum of the weighted levels before the alpha clamp.
    accum: RenderTarget,
    accum_group: wgpu::BindGroup,
}

/// GPU bloom filter.
///
/// Reads a layer through a caller-supplied bind group laid out with
/// [`BloomPipeline::texture_layout`] and writes the glow into an output view.
pub struct BloomPipeline {
    config: BloomConfig,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    params_bgl: wgpu::BindGroupLayout,
    texture_bgl: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    extract_pipeline: wgpu::RenderPipeline,
    downsample_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    combine_pipeline: wgpu::RenderPipeline,
    resolve_pipeline: wgpu::RenderPipeline,
    params: Vec<ParamSlot>,
    targets: BloomTargets,
}

impl BloomPipeline {
    /// `format` is used for every intermediate target and for the output view.
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        config: BloomConfig,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("bloom-shader"),
            source: wgpu::ShaderSource::Wgsl(BLOOM_SHADER_SOURCE.into()),
        });

        let params_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom-params-bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(
                        std::mem::size_of::<BloomParams>() as u64,
                    ),
                },
                count: None,
            }],
        });
        let texture_bgl = crate::post::sampled_texture_layout(device, "bloom-texture-bgl");

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("bloom-layout"),
            bind_group_layouts: &[&params_bgl, &texture_bgl],
            immediate_size: 0,
        });

        let fullscreen = |entry: &str, blend: Option<wgpu::BlendState>, label: &str| {
            crate::post::fullscreen_pipeline(device, &shader, &layout, entry, format, blend, label)
        };

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("bloom-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let params = create_param_slots(device, &params_bgl, &config);
        let targets = create_targets(
            device,
            &texture_bgl,
            &sampler,
            format,
            width,
            height,
            config.levels,
        );

        Self {
            extract_pipeline: fullscreen("fs_extract", None, "bloom-extract"),
            downsample_pipeline: fullscreen("fs_downsample", None, "bloom-downsample"),
            blur_pipeline: fullscreen("fs_blur", None, "bloom-blur"),
            combine_pipeline: fullscreen("fs_combine", Some(SUM_BLEND), "bloom-combine"),
            resolve_pipeline: fullscreen("fs_resolve", None, "bloom-resolve"),
            config,
            width,
            height,
            format,
            params_bgl,
            texture_bgl,
            sampler,
            params,
            targets,
        }
    }

    /// Layout that input bind groups passed to [`BloomPipeline::execute`] must use.
    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_bgl
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// Viewport size the chain was built for.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Recreate the targets after a viewport resize.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.targets = create_targets(
            device,
            &self.texture_bgl,
            &self.sampler,
            self.format,
            width,
            height,
            self.config.levels,
        );
    }

    pub fn config(&self) -> &BloomConfig {
        &self.config
    }

    /// Apply new parameters. A new level count rebuilds the targets at the
    /// current viewport size.
    pub fn set_config(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, config: BloomConfig) {
        let rebuild = config.levels != self.config.levels;
        self.config = config;
        if rebuild {
            self.params = create_param_slots(device, &self.params_bgl, &self.config);
            self.resize(device, self.width, self.height);
            return;
        }
        for (slot, params) in self.params.iter().zip(bloom_uniforms(&self.config)) {
            queue.write_buffer(&slot.buffer, 0, bytemuck::cast_slice(&[params]));
        }
    }

    /// Extract, downsample, blur, combine and resolve into `output`.
    ///
    /// `output` may be the texture bound by `input`: the extract pass is the
    /// only one that reads `input` and it runs first.
    pub fn execute(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::BindGroup,
        output: &wgpu::TextureView,
    ) {
        let t = &self.targets;
        if t.levels.is_empty() || self.params.len() < FIRST_LEVEL_SLOT {
            return;
        }
        let clear = wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT);
        let horizontal = &self.params[HORIZONTAL_SLOT].bind_group;
        let vertical = &self.params[VERTICAL_SLOT].bind_group;

        let pass = |encoder: &mut wgpu::CommandEncoder,
                    pipeline: &wgpu::RenderPipeline,
                    params: &wgpu::BindGroup,
                    source: &wgpu::BindGroup,
                    target: &wgpu::TextureView,
                    load: wgpu::LoadOp<wgpu::Color>,
                    label: &str| {
            let mut rpass = crate::post::begin_color_pass(encoder, target, load, label);
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, params, &[]);
            rpass.set_bind_group(1, source, &[]);
            rpass.draw(0..3, 0..1);
        };

        pass(
            encoder,
            &self.extract_pipeline,
            horizontal,
            input,
            &t.levels[0].view,
            clear,
            "bloom-extract",
        );
        for i in 1..t.levels.len() {
            pass(
                encoder,
                &self.downsample_pipeline,
                horizontal,
                &t.level_groups[i - 1],
                &t.levels[i].view,
                clear,
                "bloom-downsample",
            );
        }
        for i in 0..t.levels.len() {
            pass(
                encoder,
                &self.blur_pipeline,
                horizontal,
                &t.level_groups[i],
                &t.scratch[i].view,
                clear,
                "bloom-blur-h",
            );
            pass(
                encoder,
                &self.blur_pipeline,
                vertical,
                &t.scratch_groups[i],
                &t.levels[i].view,
                clear,
                "bloom-blur-v",
            );
        }
        let weighted = self.params[FIRST_LEVEL_SLOT..].iter().zip(&t.level_groups);
        for (i, (slot, level)) in weighted.enumerate() {
            let load = if i == 0 { clear } else { wgpu::LoadOp::Load };
            pass(
                encoder,
                &self.combine_pipeline,
                &slot.bind_group,
                level,
                &t.accum.view,
                load,
                "bloom-combine",
            );
        }
        pass(
            encoder,
            &self.resolve_pipeline,
            horizontal,
            &t.accum_group,
            output,
            clear,
            "bloom-resolve",
        );
    }
}

fn create_param_slots(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    config: &BloomConfig,
) -> Vec<ParamSlot> {
    use wgpu::util::DeviceExt;
    bloom_uniforms(config)
        .into_iter()
        .map(|params| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("bloom-params"),
                contents: bytemuck::cast_slice(&[params]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("bloom-params-bg"),
                layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            ParamSlot { buffer, bind_group }
        })
        .collect()
}

/// Sizes of the blur levels for a viewport, halving with a floor of 1 the
/// same way the CPU downsample does.
pub fn level_sizes(width: u32, height: u32, levels: u32) -> Vec<(u32, u32)> {
    let mut size = (width, height);
    (0..levels)
        .map(|_| {
            size = ((size.0 / 2).max(1), (size.1 / 2).max(1));
            size
        })
        .collect()
}

fn create_targets(
    device: &wgpu::Device,
    texture_bgl: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
    levels: u32,
) -> BloomTargets {
    let bind = |target: &RenderTarget, label: &str| {
        crate::post::sampled_bind_group(device, texture_bgl, &target.view, sampler, label)
    };

    let accum = RenderTarget::new(device, "bloom-accum", format, width, height);
    let mut targets = BloomTargets {
        levels: Vec::new(),
        level_groups: Vec::new(),
        scratch: Vec::new(),
        scratch_groups: Vec::new(),
        accum_group: bind(&accum, "bloom-accum-bg"),
        accum,
    };

    for (i, (w, h)) in level_sizes(width, height, levels).into_iter().enumerate() {
        let level = RenderTarget::new(device, "bloom-level", format, w, h);
        let scratch = RenderTarget::new(device, "bloom-scratch", format, w, h);
        targets.level_groups.push(bind(&level, "bloom-level-bg"));
        targets.scratch_groups.push(bind(&scratch, "bloom-scratch-bg"));
        targets.levels.push(level);
        targets.scratch.push(scratch);
        log::trace!("Bloom level {i}: {w}x{h}");
    }
    targets
}
