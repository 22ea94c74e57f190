//! Configuration structs with the galaxy's default constants and RON persistence.

use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window settings.
    pub window: WindowConfig,
    /// Field generation: counts, region spreads, spiral shape.
    pub galaxy: GalaxyConfig,
    /// Star sizing, opacity, hover, and the star-type table.
    pub stars: StarConfig,
    /// Haze sprite bounds.
    pub haze: HazeConfig,
    /// Central binary system.
    pub binary: BinaryConfig,
    /// Fixed viewing camera.
    pub camera: CameraConfig,
    /// Compositor settings.
    pub render: RenderConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in logical pixels.
    pub width: u32,
    /// Window height in logical pixels.
    pub height: u32,
    /// Enable vsync (PresentMode::Fifo).
    pub vsync: bool,
    /// Request a transparent window so the composited alpha shows the desktop.
    pub transparent: bool,
    /// Window title.
    pub title: String,
}

/// Procedural field parameters. Distances are in scene units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GalaxyConfig {
    /// Star count driving the core/outer-core/arm split.
    pub num_stars: u32,
    /// Number of spiral arms. Zero is rejected by the generator.
    pub num_arms: u32,
    /// Axial standard deviation of the disk.
    pub thickness: f32,
    pub core_x_dist: f32,
    pub core_y_dist: f32,
    pub outer_core_x_dist: f32,
    pub outer_core_y_dist: f32,
    /// Radial spread along an arm; also the spiral winding length scale.
    pub arm_x_dist: f32,
    pub arm_y_dist: f32,
    pub arm_x_mean: f32,
    pub arm_y_mean: f32,
    /// Spiral winding factor.
    pub spiral: f32,
    /// Haze sprites per star.
    pub haze_ratio: f32,
    /// Extra stars scattered beyond the arms, as a fraction of `num_stars`.
    pub outer_star_ratio: f32,
    pub outer_star_radius_min: f32,
    pub outer_star_radius_max: f32,
    /// Fixed RNG seed. `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Container orientation as XYZ Euler angles in radians.
    pub orientation: [f32; 3],
    /// Container translation.
    pub offset: [f32; 3],
    /// Container spin about its local Z axis, radians per reference frame.
    pub spin_per_frame: f32,
}

/// One row of the star-type table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StarTypeEntry {
    /// Relative weight in percent.
    pub percentage: f32,
    /// sRGB color as `0xRRGGBB`.
    pub color: u32,
    /// Size class multiplier.
    pub size: f32,
}

/// Star animation parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StarConfig {
    pub min_size: f32,
    pub max_size: f32,
    /// Camera distance divisor used before size scaling.
    pub distance_scale: f32,
    pub min_opacity: f32,
    /// Opacity ceiling. Values above 1.0 drive bloom intensity.
    pub max_opacity: f32,
    /// Pointer proximity radius in NDC units.
    pub hover_radius: f32,
    /// Per-frame low-pass factor for hover brightness.
    pub hover_blend: f32,
    pub types: Vec<StarTypeEntry>,
}

/// Haze sprite parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HazeConfig {
    pub min_size: f32,
    pub max_size: f32,
    /// Maximum opacity, reached at `3 * distance_scale` from the camera.
    pub opacity: f32,
    /// sRGB color as `0xRRGGBB`.
    pub color: u32,
    pub distance_scale: f32,
}

/// Central binary star parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BinaryConfig {
    pub enabled: bool,
    /// Distance of each sun from the shared pivot.
    pub orbit_radius: f32,
    /// Pivot rotation in radians per reference frame.
    pub rotation_speed: f32,
}

/// Viewing camera.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub up: [f32; 3],
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

/// Bloom parameters for the bloom layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BloomSettings {
    pub exposure: f32,
    pub strength: f32,
    /// Luminance above which pixels contribute to bloom.
    pub threshold: f32,
    /// Blend between tight and wide blur levels, in [0, 1].
    pub radius: f32,
    /// Number of blur levels (1..=8).
    pub levels: u32,
}

/// Optional cosmetic passes applied to the base layer before the merge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PostConfig {
    pub chromatic_aberration: bool,
    pub aberration_offset: f32,
    pub aberration_intensity: f32,
    pub vintage_grain: bool,
    pub grain_intensity: f32,
    pub color_shift: f32,
}

/// Compositor configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub bloom: BloomSettings,
    pub post: PostConfig,
    /// Tone mapping exposure applied at present.
    pub exposure: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Log hover proximity changes for every star.
    pub hover_diagnostics: bool,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            vsync: true,
            transparent: true,
            title: "Galaxy".to_string(),
        }
    }
}

impl Default for GalaxyConfig {
    fn default() -> Self {
        Self {
            num_stars: 4000,
            num_arms: 2,
            thickness: 8.0,
            core_x_dist: 50.0,
            core_y_dist: 50.0,
            outer_core_x_dist: 150.0,
            outer_core_y_dist: 150.0,
            arm_x_dist: 100.0,
            arm_y_dist: 50.0,
            arm_x_mean: 200.0,
            arm_y_mean: 100.0,
            spiral: 2.0,
            haze_ratio: 0.25,
            outer_star_ratio: 0.06,
            outer_star_radius_min: 900.0,
            outer_star_radius_max: 1800.0,
            seed: None,
            orientation: [PI / 8.0, PI / 7.0, PI / 2.0],
            offset: [-250.0, 0.0, 0.0],
            spin_per_frame: -0.001,
        }
    }
}

impl StarConfig {
    /// The default star-type table: warm dwarfs dominate, red supergiants are rare.
    pub fn default_types() -> Vec<StarTypeEntry> {
        vec![
            StarTypeEntry { percentage: 45.0, color: 0xffd7aa, size: 0.4 },
            StarTypeEntry { percentage: 20.0, color: 0xff9d5c, size: 0.5 },
            StarTypeEntry { percentage: 15.0, color: 0xffecb8, size: 0.85 },
            StarTypeEntry { percentage: 10.0, color: 0xe8e8ff, size: 1.0 },
            StarTypeEntry { percentage: 7.0, color: 0xb0c4ff, size: 1.3 },
            StarTypeEntry { percentage: 3.0, color: 0xff5555, size: 1.8 },
        ]
    }
}

impl Default for StarConfig {
    fn default() -> Self {
        Self {
            min_size: 0.1,
            max_size: 1.5,
            distance_scale: 250.0,
            min_opacity: 0.7,
            max_opacity: 6.0,
            hover_radius: 0.2,
            hover_blend: 0.15,
            types: Self::default_types(),
        }
    }
}

impl Default for HazeConfig {
    fn default() -> Self {
        Self {
            min_size: 20.0,
            max_size: 35.0,
            opacity: 0.15,
            color: 0xff2800,
            distance_scale: 250.0,
        }
    }
}

impl Default for BinaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            orbit_radius: 25.0,
            rotation_speed: 0.001,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [375.0, 750.0, 750.0],
            target: [400.0, 0.0, 0.0],
            up: [0.0, 0.0, 1.0],
            fov_y_degrees: 30.0,
            near: 0.1,
            far: 5_000_000.0,
        }
    }
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            exposure: 1.1,
            strength: 1.5,
            threshold: 0.5,
            radius: 0.4,
            levels: 5,
        }
    }
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            chromatic_aberration: false,
            aberration_offset: 0.002,
            aberration_intensity: 1.0,
            vintage_grain: false,
            grain_intensity: 0.05,
            color_shift: 0.3,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            bloom: BloomSettings::default(),
            post: PostConfig::default(),
            exposure: 0.5,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            hover_diagnostics: false,
        }
    }
}

// --- Validation ---

impl Config {
    /// Reject values the window and compositor cannot work with.
    ///
    /// Field-generation constraints (arm count, spreads, ratios) are checked by
    /// the generator itself when it is constructed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window",
                reason: "width and height must be non-zero",
            });
        }
        if !(1..=8).contains(&self.render.bloom.levels) {
            return Err(ConfigError::InvalidValue {
                field: "render.bloom.levels",
                reason: "must be between 1 and 8",
            });
        }
        if !(0.0..=1.0).contains(&self.render.bloom.radius) {
            return Err(ConfigError::InvalidValue {
                field: "render.bloom.radius",
                reason: "must be between 0 and 1",
            });
        }
        if !(self.stars.min_size <= self.stars.max_size) {
            return Err(ConfigError::InvalidValue {
                field: "stars.min_size",
                reason: "must not exceed stars.max_size",
            });
        }
        if !(self.stars.min_opacity <= self.stars.max_opacity) {
            return Err(ConfigError::InvalidValue {
                field: "stars.min_opacity",
                reason: "must not exceed stars.max_opacity",
            });
        }
        if !(self.haze.min_size <= self.haze.max_size) {
            return Err(ConfigError::InvalidValue {
                field: "haze.min_size",
                reason: "must not exceed haze.max_size",
            });
        }
        if !(self.camera.near > 0.0 && self.camera.near < self.camera.far) {
            return Err(ConfigError::InvalidValue {
                field: "camera.near",
                reason: "must be positive and below camera.far",
            });
        }
        Ok(())
    }
}

/// File name of the persisted config inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ron";

impl Config {
    pub fn file_path(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILE_NAME)
    }

    fn read_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        ron::from_str(&text).map_err(ConfigError::ParseError)
    }

    /// Read `config.ron` from `config_dir`. A missing file is replaced by the
    /// defaults, which are written back so there is something to edit.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::file_path(config_dir);
        if !path.exists() {
            let defaults = Self::default();
            defaults.save(config_dir)?;
            log::info!("No config found, wrote defaults to {}", path.display());
            return Ok(defaults);
        }
        let config = Self::read_from(&path)?;
        log::info!("Using config {}", path.display());
        Ok(config)
    }

    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;
        let style = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let text = ron::ser::to_string_pretty(self, style).map_err(ConfigError::SerializeError)?;
        std::fs::write(Self::file_path(config_dir), text).map_err(ConfigError::WriteError)
    }

    /// Parse the file again. `None` when it matches `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = Self::read_from(&Self::file_path(config_dir))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("Config file changed on disk");
        Ok(Some(fresh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_output_names_galaxy_shape() {
        let dir = tempfile::tempdir().unwrap();
        Config::default().save(dir.path()).unwrap();
        let text = std::fs::read_to_string(Config::file_path(dir.path())).unwrap();
        assert!(text.contains("num_stars: 4000"));
        assert!(text.contains("num_arms: 2"));
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(window: (), galaxy: (num_stars: 1000))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.galaxy.num_stars, 1000);
        assert_eq!(config.galaxy.num_arms, 2);
        assert_eq!(config.render, RenderConfig::default());
        assert_eq!(config.stars.types.len(), 6);
    }

    #[test]
    fn test_unknown_keys_are_tolerated() {
        let parsed = ron::from_str::<Config>("(future_setting: true, galaxy: (seed: Some(3)))");
        assert_eq!(parsed.unwrap().galaxy.seed, Some(3));
    }

    #[test]
    fn test_default_star_table_sums_to_one_hundred() {
        let total: f32 = StarConfig::default_types().iter().map(|t| t.percentage).sum();
        assert!((total - 100.0).abs() < 1e-4, "star table sums to {total}");
    }

    #[test]
    fn test_default_bloom_matches_reference_look() {
        let bloom = BloomSettings::default();
        assert_eq!(bloom.threshold, 0.5);
        assert_eq!(bloom.strength, 1.5);
        assert_eq!(bloom.radius, 0.4);
    }

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let mut config = Config::default();
        config.window.height = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "window", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_star_sizes() {
        let mut config = Config::default();
        config.stars.min_size = 2.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nan_bloom_radius() {
        let mut config = Config::default();
        config.render.bloom.radius = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut tuned = Config::default();
        tuned.galaxy.num_stars = 12_000;
        tuned.galaxy.seed = Some(7);
        tuned.render.post.vintage_grain = true;
        tuned.save(dir.path()).unwrap();

        assert_eq!(Config::load_or_create(dir.path()).unwrap(), tuned);
    }

    #[test]
    fn test_first_run_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(loaded, Config::default());
        assert!(Config::file_path(dir.path()).is_file());
    }

    #[test]
    fn test_reload_reports_edited_arms() {
        let dir = tempfile::tempdir().unwrap();
        let running = Config::default();
        running.save(dir.path()).unwrap();
        assert!(running.reload(dir.path()).unwrap().is_none());

        let mut edited = running.clone();
        edited.galaxy.num_arms = 4;
        edited.save(dir.path()).unwrap();
        let fresh = running.reload(dir.path()).unwrap();
        assert_eq!(fresh.map(|c| c.galaxy.num_arms), Some(4));
    }

    #[test]
    fn test_garbage_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(Config::file_path(dir.path()), "{{not valid}}").unwrap();
        assert!(matches!(
            Config::load_or_create(dir.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
