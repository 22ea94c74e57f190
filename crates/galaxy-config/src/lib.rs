//! Configuration system for the galaxy renderer.
//!
//! Every numeric constant the field generator, the animated bodies, and the
//! compositor consume lives here. Settings persist to disk as RON, accept CLI
//! overrides via clap, and tolerate missing or unknown fields.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    BinaryConfig, BloomSettings, CameraConfig, Config, DebugConfig, GalaxyConfig, HazeConfig,
    PostConfig, RenderConfig, StarConfig, StarTypeEntry, WindowConfig, CONFIG_FILE_NAME,
};
pub use error::ConfigError;
