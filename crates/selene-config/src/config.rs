//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub body: BodyConfig,
    pub lod: LodConfig,
    pub debug: DebugConfig,
}

/// Output surface settings. The headless driver renders offscreen at this size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels; also the screen height used by the error metric.
    pub height: u32,
    pub title: String,
}

/// Camera projection and the scripted descent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f64,
    /// Altitude above the surface at the first frame, in meters.
    pub start_altitude_m: f64,
    /// Lowest altitude the descent reaches, in meters.
    pub min_altitude_m: f64,
    /// Fraction of the current altitude lost each frame.
    pub descent_rate: f64,
    /// Frames the descent runs for.
    pub frames: u32,
}

/// The body being rendered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BodyConfig {
    /// Reference sphere radius in meters.
    pub radius_m: f64,
    /// 16-bit grayscale equirectangular heightmap. `None` renders a smooth sphere.
    pub heightmap: Option<PathBuf>,
    /// Elevation span covered by the full 16-bit range, in meters.
    pub elevation_scale_m: f64,
    /// Elevation of a zero sample, in meters.
    pub elevation_offset_m: f64,
}

/// Split/merge tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    pub max_depth: u32,
    /// Vertices per patch edge.
    pub grid_resolution: u32,
    /// Screen-space error in pixels above which a leaf splits.
    pub split_threshold: f64,
    /// Screen-space error in pixels below which four leaves merge.
    pub merge_threshold: f64,
    /// New patches allowed per frame; each split costs four.
    pub max_splits_per_frame: u32,
    pub meshes_per_batch: u32,
}

/// Debug/development settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter, e.g. "debug" or "info,selene_lod=trace".
    pub log_level: String,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Selene".to_string(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 70.0,
            start_altitude_m: 1_000_000.0,
            min_altitude_m: 100.0,
            descent_rate: 0.05,
            frames: 240,
        }
    }
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            radius_m: 1_737_400.0,
            heightmap: None,
            elevation_scale_m: 20_000.0,
            elevation_offset_m: -10_000.0,
        }
    }
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            max_depth: 15,
            grid_resolution: 33,
            split_threshold: 2.0,
            merge_threshold: 1.0,
            max_splits_per_frame: 64,
            meshes_per_batch: 64,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Platform config directory for Selene, if the platform has one.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("selene"))
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = read_config(&config_path)?;
            let config = parse_config(&contents, &config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::WriteError {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::WriteError {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let contents = read_config(&config_path)?;
        let new_config = parse_config(&contents, &config_path)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

fn read_config(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_config(contents: &str, path: &Path) -> Result<Config, ConfigError> {
    ron::from_str(contents).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}
