//! # Error Types
//!
//! Errors surfaced by the terrain container, the grid march, and configuration
//! loading. Vertical queries outside the world never fail; they read as empty.

use std::path::PathBuf;

use thiserror::Error;

/// Failures of world-space block access and ray traversal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TerrainError {
    /// The queried world coordinate lies in a chunk that has not been instantiated.
    #[error("no chunk exists at world coordinates ({x}, {y}, {z})")]
    NoChunk {
        /// World-space x
        x: i32,
        /// World-space y
        y: i32,
        /// World-space z
        z: i32,
    },

    /// A write targeted a height outside `[0, CHUNK_HEIGHT)`.
    #[error("block height {y} is outside the world's vertical range")]
    HeightOutOfRange {
        /// The rejected height
        y: i32,
    },

    /// The grid march could not choose an axis to step along.
    #[error("ray direction ({x}, {y}, {z}) has no axis to step along")]
    DegenerateRay {
        /// Direction x component
        x: f32,
        /// Direction y component
        y: f32,
        /// Direction z component
        z: f32,
    },
}

/// Failures while loading an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that was being read
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for the expected shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value the terrain cannot run with.
    #[error("invalid config: {0}")]
    Invalid(String),
}
