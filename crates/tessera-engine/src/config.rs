//! Engine configuration.
//!
//! Loaded from `tessera.toml`. A missing or unreadable file falls back to
//! defaults; a readable file with an invalid world section is an error.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tessera_common::{ConfigError, TesseraResult};
use tessera_world::{CollisionConfig, WorldConfig};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "tessera.toml";

/// Minimum camera zoom.
pub const MIN_ZOOM: f32 = 0.1;

/// Maximum camera zoom.
pub const MAX_ZOOM: f32 = 5.0;

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Viewport ===
    /// Viewport width in screen pixels
    pub viewport_width: u32,
    /// Viewport height in screen pixels
    pub viewport_height: u32,
    /// Camera zoom (0.1-5.0)
    pub zoom: f32,

    // === Player ===
    /// Player collision radius in pixels
    pub player_radius: f32,
    /// Heading change per frame in radians
    pub turn_rate: f32,

    // === Simulation ===
    /// Frames to run before exiting
    pub frames: u32,
    /// Fixed frame delta in seconds
    pub frame_dt: f32,
    /// Persisted world to reconcile chunks with
    pub world_id: u64,
    /// JSON file of stored cell changes, if any
    pub changes_file: Option<PathBuf>,
    /// Start with the tile grid overlay on
    pub show_grid: bool,

    // === World ===
    /// World generation parameters
    pub world: WorldConfig,
    /// Collision settings
    pub collision: CollisionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 720,
            zoom: 1.0,

            player_radius: 15.0,
            turn_rate: 0.01,

            frames: 600,
            frame_dt: 1.0 / 60.0,
            world_id: 1,
            changes_file: None,
            show_grid: false,

            world: WorldConfig::default(),
            collision: CollisionConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `tessera.toml` in the working directory.
    pub fn load() -> TesseraResult<Self> {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration from a specific path.
    ///
    /// Returns defaults if the file doesn't exist or doesn't parse.
    pub fn load_from<P: AsRef<Path>>(path: P) -> TesseraResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        let mut config = match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    config
                },
                Err(e) => {
                    warn!("Failed to parse config file: {e}");
                    Self::default()
                },
            },
            Err(e) => {
                warn!("Failed to read config file: {e}");
                Self::default()
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> TesseraResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamp engine values to sensible ranges and check the world section.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.viewport_width = self.viewport_width.clamp(320, 7680);
        self.viewport_height = self.viewport_height.clamp(240, 4320);
        self.zoom = if self.zoom.is_finite() {
            self.zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            1.0
        };
        self.player_radius = if self.player_radius.is_finite() {
            self.player_radius.clamp(5.0, 50.0)
        } else {
            15.0
        };
        if !self.frame_dt.is_finite() || self.frame_dt <= 0.0 {
            self.frame_dt = 1.0 / 60.0;
        }
        if !self.turn_rate.is_finite() {
            self.turn_rate = 0.0;
        }

        self.world.validate()?;
        self.collision.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tessera_common::TesseraError;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.viewport_width, 1280);
        assert_eq!(config.world.seed, 12345);
        assert_eq!(config.world.chunk_size, 64);
        assert_eq!(config.collision.grid_size, 64.0);
        assert!(config.collision.enabled);
    }

    #[test]
    fn test_config_validation_clamps() {
        let mut config = EngineConfig::default();
        config.zoom = 12.0;
        config.player_radius = 1.0;
        config.frame_dt = -1.0;

        config.validate().expect("world section is valid");

        assert_eq!(config.zoom, MAX_ZOOM);
        assert_eq!(config.player_radius, 5.0);
        assert!((config.frame_dt - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join(CONFIG_FILE);

        let mut config = EngineConfig::default();
        config.world.seed = 777;
        config.world.biome_plains_fraction = 0.25;
        config.frames = 12;
        config.collision.enabled = false;
        config.save_to(&config_path).expect("Failed to save config");

        let loaded = EngineConfig::load_from(&config_path).expect("valid config");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "frames = 3\n\n[world]\nseed = 42\nchunk_count = 8\n")
            .expect("Failed to write config");

        let loaded = EngineConfig::load_from(&config_path).expect("valid config");
        assert_eq!(loaded.frames, 3);
        assert_eq!(loaded.world.seed, 42);
        assert_eq!(loaded.world.chunk_count, 8);
        assert_eq!(loaded.world.chunk_size, 64);
        assert_eq!(loaded.world.placement_profiles.len(), 3);
        assert_eq!(loaded.viewport_height, 720);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = EngineConfig::load_from("/nonexistent/path/tessera.toml").expect("defaults");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "frames = \"many\"").expect("Failed to write config");

        let config = EngineConfig::load_from(&config_path).expect("defaults");
        assert_eq!(config.frames, 600);
    }

    #[test]
    fn test_invalid_world_section_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "[world]\nchunk_size = 0\n").expect("Failed to write config");

        assert!(matches!(
            EngineConfig::load_from(&config_path),
            Err(TesseraError::Config(ConfigError::ZeroChunkSize))
        ));
    }

    #[test]
    fn test_oversized_world_section_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "[world]\nchunk_size = 1\nchunk_count = 46340\n")
            .expect("Failed to write config");

        assert!(matches!(
            EngineConfig::load_from(&config_path),
            Err(TesseraError::Config(ConfigError::ChunkCountTooLarge { .. }))
        ));
    }

    #[test]
    fn test_save_to_unwritable_path_is_io_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "").expect("Failed to write file");

        let result = EngineConfig::default().save_to(blocker.join(CONFIG_FILE));
        assert!(matches!(result, Err(TesseraError::Io(_))));
    }
}
