//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Galaxy renderer command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "galaxy", about = "Animated spiral galaxy renderer")]
pub struct CliArgs {
    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Total star count.
    #[arg(long)]
    pub stars: Option<u32>,

    /// Number of spiral arms.
    #[arg(long)]
    pub arms: Option<u32>,

    /// Fixed RNG seed for a reproducible field.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Render headless with the software compositor and write a PNG here.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Frames to simulate before writing the snapshot.
    #[arg(long, default_value_t = 1)]
    pub frames: u32,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(stars) = args.stars {
            self.galaxy.num_stars = stars;
        }
        if let Some(arms) = args.arms {
            self.galaxy.num_arms = arms;
        }
        if let Some(seed) = args.seed {
            self.galaxy.seed = Some(seed);
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
