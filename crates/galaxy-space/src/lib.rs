//! Galaxy content: procedural field generation and per-body animation.

pub mod binary;
pub mod context;
pub mod galaxy;
pub mod generator;
pub mod haze;
pub mod oscillator;
pub mod sampler;
pub mod spiral;
pub mod star;
pub mod star_types;

pub use binary::{BinarySystem, GlowShell, PointLight, SunBody};
pub use context::FrameContext;
pub use galaxy::{Galaxy, GalaxyError, UpdateStats};
pub use generator::{FieldGenerator, GenerationError, HazeCounts, Region, RegionCounts};
pub use haze::{Haze, haze_opacity};
pub use oscillator::Oscillator;
pub use sampler::RandomSampler;
pub use spiral::SpiralTransform;
pub use star::{Hover, Star, StarAnimation};
pub use star_types::{StarType, StarTypeError, StarTypeTable};
