//! wgpu executor for the frame plan.
//!
//! [`GpuCompositor`] owns the pipelines and the HDR layer targets across
//! frames. [`GpuCompositor::begin_frame`] hands out a [`GpuFrame`] that
//! records every pass into one command encoder and presents on `finish`.

use crate::bloom::BloomPipeline;
use crate::compositor::{FrameInputs, PassExecutor};
use crate::error::RenderError;
use crate::gpu::RenderContext;
use crate::graph::{CompositorSettings, Pass, Program, Target};
use crate::layers::RenderLayer;
use crate::post::{PostParams, PostPipelines, PostProgram, RenderTarget};
use crate::sprite::SpritePipeline;

/// Format of every intermediate layer target.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Targets sized to the current viewport.
struct GpuTargets {
    width: u32,
    height: u32,
    /// Indexed by [`Target::index`]; the screen slot is unused.
    layers: Vec<RenderTarget>,
    /// Copy of a layer, read by in-place filters.
    scratch: RenderTarget,
    post_inputs: Vec<wgpu::BindGroup>,
    scratch_input: wgpu::BindGroup,
    bloom_input: wgpu::BindGroup,
    merge_input: wgpu::BindGroup,
}

impl GpuTargets {
    fn new(device: &wgpu::Device, post: &PostPipelines, bloom: &BloomPipeline, width: u32, height: u32) -> Self {
        let layers: Vec<RenderTarget> = ["layer-bloom", "layer-overlay", "layer-base", "layer-composite", "layer-screen"]
            .into_iter()
            .map(|label| RenderTarget::new(device, label, HDR_FORMAT, width, height))
            .collect();
        let scratch = RenderTarget::new(device, "layer-scratch", HDR_FORMAT, width, height);
        let post_inputs = layers
            .iter()
            .map(|t| post.input_bind_group(device, &t.view))
            .collect();
        let scratch_input = post.input_bind_group(device, &scratch.view);
        let bloom_input = crate::post::sampled_bind_group(
            device,
            bloom.texture_layout(),
            &layers[Target::Bloom.index()].view,
            bloom.sampler(),
            "bloom-input-bg",
        );
        let merge_input = post.merge_bind_group(
            device,
            &layers[Target::Base.index()].view,
            &layers[Target::Bloom.index()].view,
            &layers[Target::Overlay.index()].view,
        );
        Self {
            width,
            height,
            layers,
            scratch,
            post_inputs,
            scratch_input,
            bloom_input,
            merge_input,
        }
    }

    fn view(&self, target: Target) -> &wgpu::TextureView {
        &self.layers[target.index()].view
    }
}

/// Long-lived GPU state for the compositor.
pub struct GpuCompositor {
    sprites: SpritePipeline,
    bloom: BloomPipeline,
    post: PostPipelines,
    targets: Option<GpuTargets>,
}

impl GpuCompositor {
    pub fn new(ctx: &RenderContext, settings: &CompositorSettings) -> Self {
        let width = ctx.surface_config.width;
        let height = ctx.surface_config.height;
        Self {
            sprites: SpritePipeline::new(&ctx.device, HDR_FORMAT),
            bloom: BloomPipeline::new(&ctx.device, HDR_FORMAT, width, height, settings.bloom.clone()),
            post: PostPipelines::new(&ctx.device, HDR_FORMAT, ctx.surface_format),
            targets: None,
        }
    }

    /// Start recording a frame.
    pub fn begin_frame<'a>(&'a mut self, ctx: &'a RenderContext) -> GpuFrame<'a> {
        let encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("galaxy-frame"),
            });
        GpuFrame {
            compositor: self,
            ctx,
            encoder: Some(encoder),
            surface: None,
            params: PostParams::default(),
            uploaded: false,
        }
    }
}

/// One frame being recorded.
pub struct GpuFrame<'a> {
    compositor: &'a mut GpuCompositor,
    ctx: &'a RenderContext,
    encoder: Option<wgpu::CommandEncoder>,
    surface: Option<(wgpu::SurfaceTexture, wgpu::TextureView)>,
    params: PostParams,
    uploaded: bool,
}

impl GpuFrame<'_> {
    fn parts(
        &mut self,
    ) -> Result<(&mut wgpu::CommandEncoder, &mut GpuCompositor, &wgpu::TextureView), RenderError> {
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| RenderError::SurfaceUnavailable("frame already finished".into()))?;
        let (_, surface_view) = self
            .surface
            .as_ref()
            .ok_or_else(|| RenderError::SurfaceUnavailable("frame not prepared".into()))?;
        Ok((encoder, self.compositor, surface_view))
    }

    fn write_params(&self) {
        self.compositor.post.write_params(&self.ctx.queue, &self.params);
    }
}

impl PassExecutor for GpuFrame<'_> {
    fn prepare(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        let max = self.ctx.max_target_dimension();
        if width > max || height > max {
            return Err(RenderError::TargetAllocation {
                width,
                height,
                reason: format!("device limit is {max}"),
            });
        }

        let compositor = &mut *self.compositor;
        let stale = compositor
            .targets
            .as_ref()
            .is_none_or(|t| (t.width, t.height) != (width, height));
        if stale {
            log::debug!("Allocating GPU layer targets at {width}x{height}");
            compositor.bloom.resize(&self.ctx.device, width, height);
            compositor.targets = Some(GpuTargets::new(
                &self.ctx.device,
                &compositor.post,
                &compositor.bloom,
                width,
                height,
            ));
        }

        let texture = self
            .ctx
            .get_current_texture()
            .map_err(|err| RenderError::SurfaceUnavailable(err.to_string()))?;
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.surface = Some((texture, view));
        Ok(())
    }

    fn execute(&mut self, pass: &Pass, inputs: &FrameInputs<'_>) -> Result<(), RenderError> {
        let ctx = self.ctx;
        match &pass.program {
            Program::ChromaticAberration(p) => {
                self.params.aberration_offset = p.offset;
                self.params.aberration_intensity = p.intensity;
                self.write_params();
            }
            Program::VintageGrain(p) => {
                self.params.grain_intensity = p.grain_intensity;
                self.params.color_shift = p.color_shift;
                self.params.time = inputs.time;
                self.write_params();
            }
            Program::Present { exposure } => {
                self.params.exposure = *exposure;
                self.write_params();
            }
            Program::Scene if !self.uploaded => {
                self.compositor.sprites.upload(
                    &ctx.device,
                    &ctx.queue,
                    inputs.camera,
                    inputs.drawables,
                );
                self.uploaded = true;
            }
            _ => {}
        }

        let (encoder, compositor, surface_view) = self.parts()?;
        let targets = compositor
            .targets
            .as_ref()
            .ok_or_else(|| RenderError::TargetAllocation {
                width: 0,
                height: 0,
                reason: "targets not prepared".into(),
            })?;
        let output = match pass.output {
            Target::Screen => surface_view,
            other => targets.view(other),
        };
        let clear = wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT);

        match &pass.program {
            Program::Clear => {
                drop(crate::post::begin_color_pass(encoder, output, clear, pass.label));
            }
            Program::Scene => {
                let layers: Vec<RenderLayer> = RenderLayer::ALL
                    .into_iter()
                    .filter(|l| pass.filter.is_some_and(|f| f.contains(*l)))
                    .collect();
                if layers.is_empty() {
                    drop(crate::post::begin_color_pass(encoder, output, clear, pass.label));
                }
                for (i, layer) in layers.into_iter().enumerate() {
                    let load = if i == 0 { clear } else { wgpu::LoadOp::Load };
                    compositor.sprites.draw(encoder, output, layer, load, pass.label);
                }
            }
            Program::BloomFilter(config) => {
                if compositor.bloom.config() != config {
                    compositor.bloom.set_config(&ctx.device, &ctx.queue, config.clone());
                }
                compositor.bloom.execute(encoder, &targets.bloom_input, output);
            }
            Program::ChromaticAberration(_) | Program::VintageGrain(_) => {
                let source = pass.inputs.first().copied().unwrap_or(pass.output);
                let size = targets.layers[source.index()].texture.size();
                encoder.copy_texture_to_texture(
                    targets.layers[source.index()].texture.as_image_copy(),
                    targets.scratch.texture.as_image_copy(),
                    size,
                );
                let program = if matches!(pass.program, Program::ChromaticAberration(_)) {
                    PostProgram::ChromaticAberration
                } else {
                    PostProgram::VintageGrain
                };
                compositor.post.run(encoder, program, &targets.scratch_input, output);
            }
            Program::Merge => {
                compositor.post.run_merge(encoder, &targets.merge_input, output);
            }
            Program::Present { .. } => {
                let source = pass.inputs.first().copied().unwrap_or(Target::Composite);
                compositor.post.run(
                    encoder,
                    PostProgram::Present,
                    &targets.post_inputs[source.index()],
                    output,
                );
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| RenderError::SurfaceUnavailable("frame already finished".into()))?;
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        if let Some((texture, _)) = self.surface.take() {
            texture.present();
        }
        Ok(())
    }
}
