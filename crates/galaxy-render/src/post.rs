//! Full-screen GPU passes: merge, cosmetic effects, present.
//!
//! Also hosts the small helpers every full-screen pass shares (target
//! creation, sampled bind groups, pipeline boilerplate).

use bytemuck::{Pod, Zeroable};

/// `One + One` colour blending; alpha uses the standard over operator.
pub(crate) const ADDITIVE_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent::OVER,
};

/// Uniform shared by every post pass.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct PostParams {
    pub aberration_offset: f32,
    pub aberration_intensity: f32,
    pub grain_intensity: f32,
    pub color_shift: f32,
    pub time: f32,
    pub exposure: f32,
    pub _pad: [f32; 2],
}

/// Single-input passes: chromatic aberration, vintage grain, present.
pub const POST_SHADER_SOURCE: &str = r#"
struct PostParams {
    aberration_offset: f32,
    aberration_intensity: f32,
    grain_intensity: f32,
    color_shift: f32,
    time: f32,
    exposure: f32,
    _pad0: f32,
    _pad1: f32,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0) var<uniform> params: PostParams;
@group(1) @binding(0) var input_tex: texture_2d<f32>;
@group(1) @binding(1) var input_sampler: sampler;

@vertex
fn vs_fullscreen(@builtin(vertex_index) idx: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((idx << 1u) & 2u), f32(idx & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}

fn split_channels(uv: vec2<f32>, shift: f32) -> vec4<f32> {
    let base = textureSample(input_tex, input_sampler, uv);
    let r = textureSample(input_tex, input_sampler, uv + vec2<f32>(shift, 0.0)).r;
    let b = textureSample(input_tex, input_sampler, uv - vec2<f32>(shift, 0.0)).b;
    return vec4<f32>(r, base.g, b, base.a);
}

fn hash(p: vec2<f32>) -> f32 {
    return fract(sin(dot(p, vec2<f32>(12.9898, 78.233))) * 43758.5453);
}

fn value_noise(p: vec2<f32>) -> f32 {
    let i = floor(p);
    let f = fract(p);
    let a = hash(i);
    let b = hash(i + vec2<f32>(1.0, 0.0));
    let c = hash(i + vec2<f32>(0.0, 1.0));
    let d = hash(i + vec2<f32>(1.0, 1.0));
    let u = f * f * (3.0 - 2.0 * f);
    return mix(a, b, u.x) + (c - a) * u.y * (1.0 - u.x) + (d - b) * u.x * u.y;
}

fn aces(x: vec3<f32>) -> vec3<f32> {
    let v = max(x, vec3<f32>(0.0));
    return clamp(
        (v * (2.51 * v + 0.03)) / (v * (2.43 * v + 0.59) + 0.14),
        vec3<f32>(0.0),
        vec3<f32>(1.0)
    );
}

@fragment
fn fs_chromatic(in: VertexOutput) -> @location(0) vec4<f32> {
    return split_channels(in.uv, params.aberration_offset * params.aberration_intensity);
}

@fragment
fn fs_grain(in: VertexOutput) -> @location(0) vec4<f32> {
    let shifted = split_channels(in.uv, params.color_shift * 0.01);
    let grain = (value_noise(in.uv * 300.0 + params.time * 0.1) * 2.0 - 1.0) * params.grain_intensity;
    let graded = (shifted.rgb + grain * vec3<f32>(0.1, 0.08, 0.12)) * vec3<f32>(1.05, 0.98, 1.02);
    let vignette = clamp(1.0 - length(in.uv - 0.5) * 0.3, 0.7, 1.0);
    return vec4<f32>(graded * vignette, shifted.a);
}

@fragment
fn fs_present(in: VertexOutput) -> @location(0) vec4<f32> {
    let hdr = textureSample(input_tex, input_sampler, in.uv);
    return vec4<f32>(aces(hdr.rgb * params.exposure), hdr.a);
}
"#;

/// Three-input merge of base, bloom and overlay.
pub const MERGE_SHADER_SOURCE: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(1) @binding(0) var base_tex: texture_2d<f32>;
@group(1) @binding(1) var bloom_tex: texture_2d<f32>;
@group(1) @binding(2) var overlay_tex: texture_2d<f32>;
@group(1) @binding(3) var merge_sampler: sampler;

@vertex
fn vs_fullscreen(@builtin(vertex_index) idx: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((idx << 1u) & 2u), f32(idx & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}

@fragment
fn fs_merge(in: VertexOutput) -> @location(0) vec4<f32> {
    let base = textureSample(base_tex, merge_sampler, in.uv);
    let bloom = textureSample(bloom_tex, merge_sampler, in.uv);
    let overlay = textureSample(overlay_tex, merge_sampler, in.uv);
    let merged = base.rgb + bloom.rgb;
    let cover = clamp(overlay.a, 0.0, 1.0);
    return vec4<f32>(merged * (1.0 - cover) + overlay.rgb, max(base.a, bloom.a));
}
"#;

/// Which single-input post program to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostProgram {
    ChromaticAberration,
    VintageGrain,
    Present,
}

/// A sampled, renderable texture.
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl RenderTarget {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// The post pipelines and their shared uniform.
pub struct PostPipelines {
    params_buffer: wgpu::Buffer,
    params_bind_group: wgpu::BindGroup,
    texture_bgl: wgpu::BindGroupLayout,
    merge_bgl: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    chromatic: wgpu::RenderPipeline,
    grain: wgpu::RenderPipeline,
    present: wgpu::RenderPipeline,
    merge: wgpu::RenderPipeline,
}

impl PostPipelines {
    /// Cosmetic and merge passes write `hdr_format`; present writes `surface_format`.
    pub fn new(
        device: &wgpu::Device,
        hdr_format: wgpu::TextureFormat,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let post_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("post-shader"),
            source: wgpu::ShaderSource::Wgsl(POST_SHADER_SOURCE.into()),
        });
        let merge_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("merge-shader"),
            source: wgpu::ShaderSource::Wgsl(MERGE_SHADER_SOURCE.into()),
        });

        let params_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post-params-bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<PostParams>() as u64
                    ),
                },
                count: None,
            }],
        });
        let texture_bgl = sampled_texture_layout(device, "post-texture-bgl");
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let merge_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("merge-bgl"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                texture_entry(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let post_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("post-layout"),
            bind_group_layouts: &[&params_bgl, &texture_bgl],
            immediate_size: 0,
        });
        let merge_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("merge-layout"),
            bind_group_layouts: &[&params_bgl, &merge_bgl],
            immediate_size: 0,
        });

        let chromatic = fullscreen_pipeline(
            device,
            &post_shader,
            &post_layout,
            "fs_chromatic",
            hdr_format,
            None,
            "post-chromatic",
        );
        let grain = fullscreen_pipeline(
            device,
            &post_shader,
            &post_layout,
            "fs_grain",
            hdr_format,
            None,
            "post-grain",
        );
        let present = fullscreen_pipeline(
            device,
            &post_shader,
            &post_layout,
            "fs_present",
            surface_format,
            None,
            "post-present",
        );
        let merge = fullscreen_pipeline(
            device,
            &merge_shader,
            &merge_layout,
            "fs_merge",
            hdr_format,
            None,
            "post-merge",
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("post-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        use wgpu::util::DeviceExt;
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("post-params"),
            contents: bytemuck::cast_slice(&[PostParams::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let params_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("post-params-bg"),
            layout: &params_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buffer.as_entire_binding(),
            }],
        });

        Self {
            params_buffer,
            params_bind_group,
            texture_bgl,
            merge_bgl,
            sampler,
            chromatic,
            grain,
            present,
            merge,
        }
    }

    pub fn write_params(&self, queue: &wgpu::Queue, params: &PostParams) {
        queue.write_buffer(&self.params_buffer, 0, bytemuck::cast_slice(&[*params]));
    }

    /// Bind group for a single-input pass reading `view`.
    pub fn input_bind_group(&self, device: &wgpu::Device, view: &wgpu::TextureView) -> wgpu::BindGroup {
        sampled_bind_group(device, &self.texture_bgl, view, &self.sampler, "post-input-bg")
    }

    pub fn merge_bind_group(
        &self,
        device: &wgpu::Device,
        base: &wgpu::TextureView,
        bloom: &wgpu::TextureView,
        overlay: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("merge-bg"),
            layout: &self.merge_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(base),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(bloom),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(overlay),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    pub fn run(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        program: PostProgram,
        input: &wgpu::BindGroup,
        output: &wgpu::TextureView,
    ) {
        let (pipeline, label) = match program {
            PostProgram::ChromaticAberration => (&self.chromatic, "post-chromatic"),
            PostProgram::VintageGrain => (&self.grain, "post-grain"),
            PostProgram::Present => (&self.present, "post-present"),
        };
        self.draw(encoder, pipeline, input, output, label);
    }

    pub fn run_merge(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        inputs: &wgpu::BindGroup,
        output: &wgpu::TextureView,
    ) {
        self.draw(encoder, &self.merge, inputs, output, "post-merge");
    }

    fn draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::RenderPipeline,
        input: &wgpu::BindGroup,
        output: &wgpu::TextureView,
        label: &str,
    ) {
        let clear = wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT);
        let mut pass = begin_color_pass(encoder, output, clear, label);
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.params_bind_group, &[]);
        pass.set_bind_group(1, input, &[]);
        pass.draw(0..3, 0..1);
    }
}

/// Layout with a filterable 2D texture at binding 0 and its sampler at binding 1.
pub(crate) fn sampled_texture_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

pub(crate) fn sampled_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

/// Full-screen triangle pipeline using `vs_fullscreen` from `shader`.
pub(crate) fn fullscreen_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    fragment_entry: &str,
    target_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: target_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}

pub(crate) fn begin_color_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    target: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
    label: &str,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(source: &str) {
        let module = naga::front::wgsl::parse_str(source).unwrap();
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .unwrap();
    }

    #[test]
    fn test_post_shader_validates() {
        validate(POST_SHADER_SOURCE);
    }

    #[test]
    fn test_merge_shader_validates() {
        validate(MERGE_SHADER_SOURCE);
    }

    #[test]
    fn test_post_params_size_matches_wgsl() {
        assert_eq!(std::mem::size_of::<PostParams>(), 32);
    }

    #[test]
    fn test_post_shader_entry_points() {
        for entry in ["vs_fullscreen", "fs_chromatic", "fs_grain", "fs_present"] {
            assert!(POST_SHADER_SOURCE.contains(&format!("fn {entry}(")));
        }
        assert!(MERGE_SHADER_SOURCE.contains("fn fs_merge("));
    }
}
