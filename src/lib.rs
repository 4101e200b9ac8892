#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Terrain
//!
//! A streaming voxel terrain: procedural generation, face-culled meshing, and a
//! zone-based scheduler that keeps the world around the player generated and
//! meshed on a pool of worker threads.
//!
//! ## Key Modules
//!
//! * `core` - Shared-ownership wrappers and the result queues workers report through
//! * `engine_state` - The headless driver, the GPU boundary, the worker pool,
//!   and the voxel world itself
//! * `config` - JSON configuration
//! * `error` - Error types
//!
//! ## Architecture
//!
//! The crate keeps a clear separation between:
//! * Pure world functions (noise, biomes, structures, terrain columns)
//! * Chunk storage and mesh extraction, which run on any thread
//! * The terrain container, which owns scheduling and all GPU work on one thread
//! * The GPU itself, reached only through the `GpuBackend` trait
//!
//! ## Usage
//!
//! ```rust
//! use voxel_terrain::{config::TerrainConfig, core::StResource, Terrain};
//! use voxel_terrain::engine_state::buffer_state::{BufferState, HeadlessBackend};
//!
//! let buffer_state = StResource::new(BufferState::new(Box::new(HeadlessBackend::new())));
//! let mut terrain = Terrain::new(TerrainConfig::default(), buffer_state);
//! terrain.initialize_nearby_chunks(0, 0, 0);
//! assert!(terrain.has_chunk_at(0, 0));
//! ```
//!
//! ## Performance Considerations
//!
//! * Chunks are generated a zone at a time on worker threads
//! * Mesh buffers are plain vectors until the owning thread uploads them
//! * Block data is kept when meshes are freed, so revisiting is cheap

use log::{error, info};

pub mod config;
pub mod core;
pub mod engine_state;
pub mod error;

pub use config::{EngineConfig, TerrainConfig};
pub use engine_state::voxels::terrain::Terrain;
pub use engine_state::EngineState;
pub use error::{ConfigError, TerrainError};

/// Initializes logging, loads the configuration named by the first command-line
/// argument (or the defaults), and runs the headless driver.
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    let config = match std::env::args().nth(1) {
        Some(path) => match EngineConfig::from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                error!("{err}");
                return;
            }
        },
        None => EngineConfig::default(),
    };

    let mut engine = EngineState::new(&config);
    engine.run_demo();
}
