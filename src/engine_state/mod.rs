//! # Engine State Module
//!
//! The driver that owns the terrain and ticks it the way a game loop would.
//!
//! ## Key Components
//!
//! * `EngineState` - Owns the terrain, the GPU buffer registry, and the player
//! * `buffer_state` - The GPU boundary: buffer registry, backend trait, RAII handles
//! * `rendering` - Mesh extraction, the mesh worker task, per-chunk GPU state
//! * `task_management` - The worker pool
//! * `voxels` - Blocks, chunks, generation, and the terrain container
//!
//! ## Architecture
//!
//! `EngineState` is the only thing a frontend talks to. Each frame it moves the
//! player, lets the terrain stream zones around the new position, and draws
//! what is in range. The terrain does the rest. Without a window, the GPU
//! boundary is a [`HeadlessBackend`](buffer_state::HeadlessBackend), which
//! keeps the whole pipeline running in tools and tests.
//!
//! ## Performance Considerations
//!
//! * Generation and meshing run on the worker pool, never on the frame
//! * The spawn area is built synchronously once, so the first frame has ground

use std::time::Duration;

use cgmath::Vector3;
use log::info;
use web_time::Instant;

use crate::config::{DemoConfig, EngineConfig};
use crate::core::StResource;
use buffer_state::{BufferState, HeadlessBackend};
use voxels::chunk::CHUNK_WIDTH;
use voxels::terrain::Terrain;

pub mod buffer_state;
pub mod rendering;
pub mod task_management;
pub mod voxels;

/// Where the player appears.
pub const SPAWN_POSITION: Vector3<f32> = Vector3::new(0.0, 175.0, 0.0);

/// Largest heading change per frame, in radians.
const MAX_TURN: f32 = 0.25;

/// The main state container for the headless engine.
///
/// # Examples
///
/// ```
/// use voxel_terrain::{config::EngineConfig, EngineState};
///
/// let mut config = EngineConfig::default();
/// config.terrain.spawn_chunk_radius = 0;
/// config.terrain.worker_count = 1;
/// let mut engine = EngineState::new(&config);
///
/// // Main loop
/// for _ in 0..3 {
///     engine.update(1.0 / 30.0);
/// }
/// ```
pub struct EngineState {
    /// GPU buffer registry shared with the terrain
    pub buffer_state: StResource<BufferState>,
    /// The voxel world
    pub terrain: Terrain,
    player_position: Vector3<f32>,
    previous_position: Vector3<f32>,
    heading: f32,
    rng: fastrand::Rng,
    demo: DemoConfig,
    frame: u64,
}

impl EngineState {
    /// Builds the terrain, generates the spawn area, and places the player.
    ///
    /// # Arguments
    ///
    /// * `config` - Terrain and driver settings
    pub fn new(config: &EngineConfig) -> Self {
        let buffer_state = StResource::new(BufferState::new(Box::new(HeadlessBackend::new())));
        let mut terrain = Terrain::new(config.terrain.clone(), buffer_state.clone());

        let start = Instant::now();
        terrain.initialize_nearby_chunks(
            SPAWN_POSITION.x as i32,
            SPAWN_POSITION.z as i32,
            config.terrain.spawn_chunk_radius,
        );
        info!(
            "Spawn area ready in {:.2?} at chunk {}",
            start.elapsed(),
            Terrain::chunk_coords_string(SPAWN_POSITION.x as i32, SPAWN_POSITION.z as i32)
        );

        let mut rng = fastrand::Rng::with_seed(config.demo.walk_seed);
        let heading = rng.f32() * std::f32::consts::TAU;
        Self {
            buffer_state,
            terrain,
            player_position: SPAWN_POSITION,
            previous_position: SPAWN_POSITION,
            heading,
            rng,
            demo: config.demo.clone(),
            frame: 0,
        }
    }

    /// Runs one frame: walks the player, streams terrain, and draws.
    ///
    /// # Arguments
    ///
    /// * `dt` - Seconds since the previous frame
    ///
    /// # Returns
    ///
    /// Number of draw calls issued
    pub fn update(&mut self, dt: f32) -> usize {
        self.heading += (self.rng.f32() * 2.0 - 1.0) * MAX_TURN;
        let step = Vector3::new(self.heading.cos(), 0.0, self.heading.sin()) * self.demo.walk_speed * dt;
        self.move_player(self.player_position + step, dt)
    }

    /// Moves the player to `position` and runs one frame there.
    ///
    /// # Returns
    ///
    /// Number of draw calls issued
    pub fn move_player(&mut self, position: Vector3<f32>, dt: f32) -> usize {
        self.previous_position = self.player_position;
        self.player_position = position;
        self.frame += 1;

        self.terrain
            .multithread(self.player_position, self.previous_position, dt);

        let reach = self.terrain.config().draw_distance * CHUNK_WIDTH;
        let x = self.player_position.x.floor() as i32;
        let z = self.player_position.z.floor() as i32;
        self.terrain.draw(x - reach, x + reach, z - reach, z + reach)
    }

    /// Runs the configured number of frames, logging statistics as it goes.
    pub fn run_demo(&mut self) {
        let dt = self.demo.tick_seconds;
        let log_interval = u64::from(self.demo.log_interval.max(1));
        let start = Instant::now();
        let mut frame_time = Duration::ZERO;

        for _ in 0..self.demo.ticks {
            let frame_start = Instant::now();
            let draws = self.update(dt);
            frame_time += frame_start.elapsed();

            if self.frame % log_interval == 0 {
                let stats = self.terrain.stats();
                let buffers = self.buffer_state.get();
                info!(
                    "Frame {}: chunk {} zone {}, {} draw(s), {} chunk(s), {} live buffer(s), {} KiB, \
                     {} block task(s), {} mesh task(s), {} upload(s), {} stale, {} freed, {} failed",
                    self.frame,
                    self.current_chunk_string(),
                    self.current_zone_string(),
                    draws,
                    self.terrain.chunk_count(),
                    buffers.live_buffers(),
                    buffers.get_total_used_memory() / 1024,
                    stats.block_tasks_dispatched,
                    stats.mesh_tasks_dispatched,
                    stats.meshes_uploaded,
                    stats.stale_meshes_discarded,
                    stats.meshes_freed,
                    stats.failed_tasks,
                );
            }
        }

        info!(
            "Ran {} frame(s) in {:.2?}, {:.2?} spent in frame updates",
            self.demo.ticks,
            start.elapsed(),
            frame_time
        );
    }

    /// Current player position.
    pub fn player_position(&self) -> Vector3<f32> {
        self.player_position
    }

    /// `"( x, z )"` of the chunk the player is in.
    pub fn current_chunk_string(&self) -> String {
        Terrain::chunk_coords_string(
            self.player_position.x.floor() as i32,
            self.player_position.z.floor() as i32,
        )
    }

    /// `"( x, z )"` of the zone the player is in.
    pub fn current_zone_string(&self) -> String {
        Terrain::zone_coords_string(
            self.player_position.x.floor() as i32,
            self.player_position.z.floor() as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.terrain.worker_count = 2;
        config.terrain.spawn_chunk_radius = 1;
        config.terrain.create_radius = 0;
        config
    }

    #[test]
    fn spawn_area_is_drawn_on_the_first_frame() {
        let mut engine = EngineState::new(&config());
        assert_eq!(engine.terrain.chunk_count(), 9);
        let draws = engine.move_player(SPAWN_POSITION, 0.0);
        assert!(draws > 0);
        assert_eq!(engine.current_chunk_string(), "( 0, 0 )");
        assert_eq!(engine.current_zone_string(), "( 0, 0 )");
    }

    #[test]
    fn walking_moves_the_player_at_walk_speed() {
        let config = config();
        let mut engine = EngineState::new(&config);
        engine.update(0.5);
        let moved = engine.player_position() - SPAWN_POSITION;
        let distance = (moved.x * moved.x + moved.z * moved.z).sqrt();
        assert!((distance - config.demo.walk_speed * 0.5).abs() < 1e-3);
        assert_eq!(moved.y, 0.0);
    }
}
