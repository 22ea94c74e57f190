//! Layered rendering for the galaxy: camera, drawables, bloom and cosmetic
//! post-processing, composited through a frame plan on the GPU or in software.

pub mod bloom;
pub mod camera;
pub mod compositor;
pub mod drawable;
pub mod effects;
pub mod error;
pub mod gpu;
pub mod gpu_compositor;
pub mod graph;
pub mod image;
pub mod layers;
pub mod post;
pub mod software;
pub mod sprite;
pub mod surface;

pub use bloom::{BloomConfig, BloomPipeline, apply_bloom};
pub use camera::{Camera, CameraUniform, ProjectedPoint, Projection};
pub use compositor::{
    Compositor, FrameInputs, FrameOutcome, PassExecutor, SkipReason, composite_overlay,
    merge_pixel,
};
pub use drawable::{Drawable, Shape, hex_to_rgb};
pub use effects::{AberrationParams, GrainParams};
pub use error::RenderError;
pub use gpu::{
    RenderContext, RenderContextError, SurfaceError, SurfacePreferences,
    init_render_context_blocking,
};
pub use gpu_compositor::{GpuCompositor, GpuFrame, HDR_FORMAT};
pub use graph::{CompositorSettings, FramePlan, Pass, Program, Target};
pub use image::{HdrImage, Rgba};
pub use layers::{LayerMask, RenderLayer};
pub use software::SoftwareRenderer;
pub use sprite::{SpriteInstance, SpritePipeline};
pub use surface::{PhysicalSize, SurfaceWrapper, ViewportChange};
