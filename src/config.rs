//! # Configuration
//!
//! Tunables for terrain streaming and for the headless driver, loaded from JSON.
//! Every field has a default, so a partial file (or no file at all) is valid.
//!
//! ```json
//! {
//!     "terrain": { "create_radius": 3, "worker_count": 4 },
//!     "demo": { "ticks": 600 }
//! }
//! ```

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Radius, in zones, of the square of zones kept generated around the player.
pub const TERRAIN_CREATE_RADIUS: i32 = 2;

/// Streaming and worker-pool settings for a [`Terrain`](crate::Terrain).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Zones within this Chebyshev radius of the player's zone are generated and meshed.
    pub create_radius: i32,
    /// Seconds between streaming dispatches.
    pub dispatch_interval: f32,
    /// Number of background worker threads.
    pub worker_count: usize,
    /// How many times a panicking task is re-published before it is abandoned.
    pub max_task_retries: u32,
    /// Chunk radius generated synchronously around the spawn point.
    pub spawn_chunk_radius: i32,
    /// Draw distance in chunks around the camera.
    pub draw_distance: i32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            create_radius: TERRAIN_CREATE_RADIUS,
            dispatch_interval: 0.5,
            worker_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            max_task_retries: 2,
            spawn_chunk_radius: 3,
            draw_distance: 24,
        }
    }
}

impl TerrainConfig {
    /// Rejects values the streaming loop cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.create_radius < 0 {
            return Err(ConfigError::Invalid(format!(
                "create_radius must be non-negative, got {}",
                self.create_radius
            )));
        }
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if !(self.dispatch_interval > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "dispatch_interval must be positive, got {}",
                self.dispatch_interval
            )));
        }
        if self.spawn_chunk_radius < 0 || self.draw_distance < 0 {
            return Err(ConfigError::Invalid(
                "spawn_chunk_radius and draw_distance must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings for the headless driver in [`run`](crate::run).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Number of simulated frames.
    pub ticks: u32,
    /// Simulated seconds per frame.
    pub tick_seconds: f32,
    /// Player speed in blocks per second.
    pub walk_speed: f32,
    /// Seed for the random walk heading.
    pub walk_seed: u64,
    /// Frames between statistics log lines.
    pub log_interval: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            ticks: 240,
            tick_seconds: 1.0 / 30.0,
            walk_speed: 24.0,
            walk_seed: 0x5eed,
            log_interval: 30,
        }
    }
}

/// Top-level configuration file shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Terrain streaming settings
    pub terrain: TerrainConfig,
    /// Headless driver settings
    pub demo: DemoConfig,
}

impl EngineConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Validates both sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.terrain.validate()?;
        if !(self.demo.tick_seconds > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tick_seconds must be positive, got {}",
                self.demo.tick_seconds
            )));
        }
        if self.demo.log_interval == 0 {
            return Err(ConfigError::Invalid(
                "log_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{ "terrain": { "create_radius": 1 } }"#).unwrap();
        assert_eq!(config.terrain.create_radius, 1);
        assert_eq!(config.terrain.dispatch_interval, 0.5);
        assert_eq!(config.demo, DemoConfig::default());
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = EngineConfig::from_json_str(r#"{ "terrain": { "worker_count": 0 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = EngineConfig::from_json_str("{ terrain: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = EngineConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
