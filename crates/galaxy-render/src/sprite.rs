//! Instanced camera-facing sprites.
//!
//! Each drawable becomes one [`SpriteInstance`]; the vertex shader expands it
//! into a quad aligned with the camera's right/up vectors. Colour blends
//! additively so overlapping stars and haze accumulate light.

use std::ops::Range;

use bytemuck::{Pod, Zeroable};

use crate::camera::{Camera, CameraUniform};
use crate::drawable::{Drawable, Shape};
use crate::layers::RenderLayer;

/// Per-instance data, 48 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SpriteInstance {
    pub position: [f32; 3],
    pub size: f32,
    /// Radiance in rgb, centre opacity in a.
    pub color: [f32; 4],
    pub shape: u32,
    pub _pad: [u32; 3],
}

impl SpriteInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32, 2 => Float32x4, 3 => Uint32];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

impl From<&Drawable> for SpriteInstance {
    fn from(d: &Drawable) -> Self {
        let [r, g, b] = d.radiance();
        Self {
            position: d.position.to_array(),
            size: d.size,
            color: [r, g, b, d.opacity.clamp(0.0, 1.0)],
            shape: match d.shape {
                Shape::Sprite => 0,
                Shape::Disc => 1,
                Shape::Glow => 2,
            },
            _pad: [0; 3],
        }
    }
}

pub const SPRITE_SHADER_SOURCE: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    right: vec4<f32>,
    up: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) local: vec2<f32>,
    @location(1) color: vec4<f32>,
    @location(2) @interpolate(flat) shape: u32,
};

@group(0) @binding(0) var<uniform> camera: Camera;

const SPRITE_EXTENT: f32 = 1.5;

@vertex
fn vs_sprite(
    @builtin(vertex_index) idx: u32,
    @location(0) center: vec3<f32>,
    @location(1) size: f32,
    @location(2) color: vec4<f32>,
    @location(3) shape: u32
) -> VertexOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0)
    );
    var extent = 1.0;
    if shape == 0u {
        extent = SPRITE_EXTENT;
    }
    let corner = corners[idx] * extent;
    let world = center + (camera.right.xyz * corner.x + camera.up.xyz * corner.y) * size;
    var out: VertexOutput;
    out.position = camera.view_proj * vec4<f32>(world, 1.0);
    out.local = corner;
    out.color = color;
    out.shape = shape;
    return out;
}

@fragment
fn fs_sprite(in: VertexOutput) -> @location(0) vec4<f32> {
    let t = length(in.local);
    var coverage = 0.0;
    if in.shape == 0u {
        coverage = select(exp(-2.0 * t * t), 0.0, t > SPRITE_EXTENT);
    } else if in.shape == 1u {
        coverage = select(1.0, 0.0, t > 1.0);
    } else {
        let f = max(1.0 - t, 0.0);
        coverage = f * f;
    }
    if coverage <= 0.0 {
        discard;
    }
    return vec4<f32>(in.color.rgb * coverage, in.color.a * coverage);
}
"#;

/// Draws instanced sprites into a render target.
pub struct SpritePipeline {
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
    capacity: usize,
    ranges: [Range<u32>; 3],
}

const INITIAL_CAPACITY: usize = 1024;

impl SpritePipeline {
    pub fn new(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sprite-shader"),
            source: wgpu::ShaderSource::Wgsl(SPRITE_SHADER_SOURCE.into()),
        });

        let camera_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sprite-camera-bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sprite-layout"),
            bind_group_layouts: &[&camera_bgl],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sprite-pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_sprite"),
                buffers: &[SpriteInstance::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_sprite"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(crate::post::ADDITIVE_BLEND),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        use wgpu::util::DeviceExt;
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sprite-camera"),
            contents: bytemuck::cast_slice(&[CameraUniform::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sprite-camera-bg"),
            layout: &camera_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        Self {
            pipeline,
            camera_buffer,
            camera_bind_group,
            instance_buffer: create_instance_buffer(device, INITIAL_CAPACITY),
            capacity: INITIAL_CAPACITY,
            ranges: [0..0, 0..0, 0..0],
        }
    }

    /// Upload the camera and every drawable, grouped by layer.
    ///
    /// All scene passes of a frame share one upload since queued writes land
    /// before the frame's command buffer runs.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        camera: &Camera,
        drawables: &[Drawable],
    ) {
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[camera.to_uniform()]),
        );

        let (instances, ranges) = group_by_layer(drawables);
        if instances.len() > self.capacity {
            self.capacity = instances.len().next_power_of_two();
            log::debug!("Growing sprite instance buffer to {}", self.capacity);
            self.instance_buffer = create_instance_buffer(device, self.capacity);
        }
        if !instances.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }
        self.ranges = ranges;
    }

    /// Draw the uploaded instances of `layer` into `target`.
    pub fn draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        layer: RenderLayer,
        load: wgpu::LoadOp<wgpu::Color>,
        label: &str,
    ) {
        let mut pass = crate::post::begin_color_pass(encoder, target, load, label);
        let range = self.ranges[layer as usize].clone();
        if range.is_empty() {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
        pass.draw(0..6, range);
    }
}

/// Flatten drawables into instances ordered Base, Bloom, Overlay, returning
/// the instance range of each layer. A drawable in several layers appears
/// once per layer.
pub fn group_by_layer(drawables: &[Drawable]) -> (Vec<SpriteInstance>, [Range<u32>; 3]) {
    let mut instances = Vec::with_capacity(drawables.len());
    let mut ranges = [0..0, 0..0, 0..0];
    for layer in RenderLayer::ALL {
        let start = instances.len() as u32;
        instances.extend(
            drawables
                .iter()
                .filter(|d| d.layers.contains(layer))
                .map(SpriteInstance::from),
        );
        ranges[layer as usize] = start..instances.len() as u32;
    }
    (instances, ranges)
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("sprite-instances"),
        size: (capacity * std::mem::size_of::<SpriteInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::LayerMask;
    use glam::Vec3;

    fn drawable(layers: LayerMask) -> Drawable {
        Drawable {
            position: Vec3::new(1.0, 2.0, 3.0),
            size: 4.0,
            color: [1.0, 0.5, 0.25],
            intensity: 2.0,
            opacity: 3.0,
            layers,
            shape: Shape::Glow,
        }
    }

    #[test]
    fn test_sprite_instance_size() {
        assert_eq!(std::mem::size_of::<SpriteInstance>(), 48);
    }

    #[test]
    fn test_instance_from_drawable() {
        let instance = SpriteInstance::from(&drawable(LayerMask::BASE));
        assert_eq!(instance.position, [1.0, 2.0, 3.0]);
        assert_eq!(instance.color, [2.0, 1.0, 0.5, 1.0]);
        assert_eq!(instance.shape, 2);
    }

    #[test]
    fn test_group_by_layer_duplicates_multi_layer_drawables() {
        let drawables = [
            drawable(LayerMask::BLOOM),
            drawable(LayerMask::BASE_AND_BLOOM),
            drawable(LayerMask::BASE),
        ];
        let (instances, ranges) = group_by_layer(&drawables);
        assert_eq!(instances.len(), 4);
        assert_eq!(ranges[RenderLayer::Base as usize], 0..2);
        assert_eq!(ranges[RenderLayer::Bloom as usize], 2..4);
        assert!(ranges[RenderLayer::Overlay as usize].is_empty());
    }

    #[test]
    fn test_sprite_shader_validates() {
        let module = naga::front::wgsl::parse_str(SPRITE_SHADER_SOURCE).unwrap();
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .unwrap();
    }
}
