//! Engine configuration.
//!
//! Loaded from `delve.toml`; a missing or invalid file falls back to defaults.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use delve_procgen::StreamingConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "delve.toml";

/// Default log directive when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "delve=info";

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === World Settings ===
    /// World seed
    pub world_seed: u64,
    /// Interest radius in chunks around the observer
    pub interest_radius: i32,

    // === Walk Settings ===
    /// Number of observer moves
    pub walk_steps: u32,
    /// Tiles moved per step
    pub walk_stride: i32,
    /// Print an ASCII map around the final position
    pub print_map: bool,
    /// Half-width of the printed map in tiles
    pub map_radius: i32,

    // === Logging ===
    /// tracing-subscriber filter directive, overridden by `RUST_LOG`
    pub log_filter: String,
    /// Emit JSON log lines
    pub log_json: bool,

    /// Streaming tunables
    pub streaming: StreamingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            world_seed: 12345,
            interest_radius: 2,

            walk_steps: 32,
            walk_stride: 12,
            print_map: true,
            map_radius: 24,

            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_json: false,

            streaming: StreamingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        let mut contents = String::new();
        if let Err(e) = fs::File::open(path).and_then(|mut file| file.read_to_string(&mut contents)) {
            warn!("Failed to read config file {}: {e}", path.display());
            return Self::default();
        }

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamp values to sensible ranges, logging each adjusted field.
    /// Streaming values are checked when the chunk manager is built.
    ///
    /// Returns the names of the fields that changed.
    pub fn validate(&mut self) -> Vec<&'static str> {
        let mut adjusted = Vec::new();
        clamp_field("interest_radius", &mut self.interest_radius, 0, 8, &mut adjusted);
        clamp_field("walk_stride", &mut self.walk_stride, 0, 1024, &mut adjusted);
        clamp_field("map_radius", &mut self.map_radius, 1, 128, &mut adjusted);
        if self.log_filter.trim().is_empty() {
            warn!("Config log_filter is empty, using {DEFAULT_LOG_FILTER}");
            self.log_filter = DEFAULT_LOG_FILTER.to_string();
            adjusted.push("log_filter");
        }
        adjusted
    }
}

fn clamp_field(name: &'static str, value: &mut i32, min: i32, max: i32, adjusted: &mut Vec<&'static str>) {
    let clamped = (*value).clamp(min, max);
    if clamped != *value {
        warn!("Config {name}={value} out of range [{min}, {max}], using {clamped}");
        *value = clamped;
        adjusted.push(name);
    }
}
