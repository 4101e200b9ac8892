//! # Terrain Module
//!
//! The spatial container of every chunk in the world, and the owner of the
//! two-stage worker pipeline that fills and meshes them.
//!
//! ## Architecture
//!
//! Chunks live in a hash map keyed by their packed `(x, z)` origin (see
//! [`keys`]). Each entry holds:
//! - the chunk itself, in an `MtResource` so workers can fill or read it
//! - the keys of its four horizontal neighbors, set when either side is created
//! - the owner's view of whether block data has arrived
//! - the chunk's GPU-side meshes
//!
//! Chunks are never removed. When the streaming window moves on, only their
//! meshes are freed; block data stays, so coming back only costs a re-mesh.
//!
//! ## Streaming
//!
//! World space is cut into 64 × 64 zones. [`Terrain::multithread`] runs once per
//! frame: every half second it works out which zones entered and left range and
//! dispatches work for them, and every frame it drains finished work. See
//! `streaming` for the state machine and `editing` for dig and place.
//!
//! ## Threading
//!
//! A `Terrain` belongs to the thread that owns the GPU context. Tasks are built
//! from shared handles without taking any chunk lock, and results come back
//! through two [`ResultQueue`]s. Meshing, on either side, only reads chunks
//! whose block data has arrived; a neighbor still being generated counts as
//! absent. Single-block reads and edits lock the one chunk they touch, so they
//! can wait on a worker that is filling or meshing it.

use std::collections::{HashMap, HashSet};

use cgmath::Vector2;
use log::{debug, info};

use crate::config::TerrainConfig;
use crate::core::{MtResource, ResultQueue, StResource};
use crate::engine_state::buffer_state::{BufferState, RenderPass};
use crate::engine_state::rendering::meshing::{ChunkMeshData, ChunkNeighborhood};
use crate::engine_state::rendering::{ChunkDrawRecord, ChunkRenderState};
use crate::engine_state::task_management::TaskManager;
use crate::error::TerrainError;

use super::block::{block_type::BlockType, direction::Direction};
use super::chunk::{Chunk, CHUNK_HEIGHT, CHUNK_WIDTH};
use super::ray_march::BlockQuery;
use keys::{chunk_origin, chunks_in_zone, coords_string, to_coords, to_key, zone_origin, ChunkKey, ZoneKey};

pub mod editing;
pub mod keys;
mod streaming;

/// Seconds on the dispatch timer at construction, so the first tick dispatches.
const INITIAL_TIMER: f32 = 0.499;

/// One chunk and the owner-side state that goes with it.
struct ChunkEntry {
    /// Block data, shared with workers
    chunk: MtResource<Chunk>,
    /// Neighbor keys by [`Direction::horizontal_index`]
    links: [Option<ChunkKey>; 4],
    /// Whether block data has been generated or the chunk was built by hand
    generated: bool,
    /// Uploaded meshes
    render: ChunkRenderState,
}

impl ChunkEntry {
    fn new(x: i32, z: i32) -> Self {
        Self {
            chunk: MtResource::new(Chunk::new(x, z)),
            links: [None; 4],
            generated: false,
            render: ChunkRenderState::default(),
        }
    }
}

/// Running totals of streaming work, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TerrainStats {
    /// Zone generation tasks published
    pub block_tasks_dispatched: u64,
    /// Mesh tasks published
    pub mesh_tasks_dispatched: u64,
    /// Worker meshes uploaded
    pub meshes_uploaded: u64,
    /// Worker meshes thrown away as outdated or out of range
    pub stale_meshes_discarded: u64,
    /// Chunk meshes freed by the streaming window
    pub meshes_freed: u64,
    /// Tasks abandoned after exhausting their retries
    pub failed_tasks: u64,
}

/// The world's chunks, their streaming state, and the workers that fill them.
pub struct Terrain {
    chunks: HashMap<ChunkKey, ChunkEntry>,
    /// Zones whose block generation has been dispatched
    generated_zones: HashSet<ZoneKey>,
    /// Zones whose block generation was abandoned
    failed_zones: HashSet<ZoneKey>,
    /// Zones inside the streaming window as of the last dispatch
    active_zones: HashSet<ZoneKey>,
    buffer_state: StResource<BufferState>,
    task_manager: TaskManager,
    block_data_results: ResultQueue<ChunkKey>,
    mesh_results: ResultQueue<ChunkMeshData>,
    new_chunk_timer: f32,
    config: TerrainConfig,
    stats: TerrainStats,
}

impl Terrain {
    /// Creates an empty terrain and starts its worker pool.
    ///
    /// # Arguments
    /// * `config` - Streaming and worker settings
    /// * `buffer_state` - GPU buffer registry meshes are uploaded to
    pub fn new(config: TerrainConfig, buffer_state: StResource<BufferState>) -> Self {
        let task_manager = TaskManager::new(config.worker_count, config.max_task_retries);
        info!(
            "Terrain created: create radius {} zone(s), {} worker(s)",
            config.create_radius,
            task_manager.worker_count()
        );
        Self {
            chunks: HashMap::new(),
            generated_zones: HashSet::new(),
            failed_zones: HashSet::new(),
            active_zones: HashSet::new(),
            buffer_state,
            task_manager,
            block_data_results: ResultQueue::new(),
            mesh_results: ResultQueue::new(),
            new_chunk_timer: INITIAL_TIMER,
            config,
            stats: TerrainStats::default(),
        }
    }

    /// Settings this terrain was built with.
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Streaming totals so far.
    pub fn stats(&self) -> TerrainStats {
        self.stats
    }

    /// The worker pool.
    pub fn task_manager(&self) -> &TaskManager {
        &self.task_manager
    }

    /// The GPU buffer registry meshes go to.
    pub fn buffer_state(&self) -> &StResource<BufferState> {
        &self.buffer_state
    }

    /// Number of chunks in the map.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Creates the chunk containing world column `(x, z)` unless it exists, and
    /// links it with any existing horizontal neighbors in both directions.
    ///
    /// # Returns
    /// Key of the chunk
    pub fn instantiate_chunk_at(&mut self, x: i32, z: i32) -> ChunkKey {
        let origin = chunk_origin(x, z);
        let key = to_key(origin.x, origin.y);
        if self.chunks.contains_key(&key) {
            return key;
        }

        let mut entry = ChunkEntry::new(origin.x, origin.y);
        for direction in Direction::HORIZONTAL {
            let (Some(slot), Some(back)) = (
                direction.horizontal_index(),
                direction.opposite().horizontal_index(),
            ) else {
                continue;
            };
            let offset = direction.offset();
            let neighbor_key = to_key(
                origin.x + offset.x * CHUNK_WIDTH,
                origin.y + offset.z * CHUNK_WIDTH,
            );
            if let Some(neighbor) = self.chunks.get_mut(&neighbor_key) {
                entry.links[slot] = Some(neighbor_key);
                neighbor.links[back] = Some(key);
            }
        }
        self.chunks.insert(key, entry);
        key
    }

    /// Returns `true` if a chunk covers world column `(x, z)`.
    pub fn has_chunk_at(&self, x: i32, z: i32) -> bool {
        let origin = chunk_origin(x, z);
        self.chunks.contains_key(&to_key(origin.x, origin.y))
    }

    /// Shared handle to the chunk covering world column `(x, z)`.
    pub fn get_chunk_at(&self, x: i32, z: i32) -> Option<MtResource<Chunk>> {
        let origin = chunk_origin(x, z);
        self.chunks
            .get(&to_key(origin.x, origin.y))
            .map(|entry| entry.chunk.clone())
    }

    /// Shared handle to the chunk with `key`.
    pub fn chunk(&self, key: ChunkKey) -> Option<MtResource<Chunk>> {
        self.chunks.get(&key).map(|entry| entry.chunk.clone())
    }

    /// Neighbor keys of `key`, indexed by [`Direction::horizontal_index`].
    pub fn links_of(&self, key: ChunkKey) -> Option<[Option<ChunkKey>; 4]> {
        self.chunks.get(&key).map(|entry| entry.links)
    }

    /// Whether the chunk with `key` has a mesh uploaded.
    pub fn is_buffered(&self, key: ChunkKey) -> bool {
        self.chunks
            .get(&key)
            .is_some_and(|entry| entry.render.is_buffered())
    }

    /// Whether the owner has seen block data arrive for `key`.
    pub fn is_generated(&self, key: ChunkKey) -> bool {
        self.chunks.get(&key).is_some_and(|entry| entry.generated)
    }

    /// Block at world `(x, y, z)`. Heights outside the world read as empty.
    ///
    /// # Errors
    /// [`TerrainError::NoChunk`] if no chunk covers `(x, z)`.
    pub fn get_block_at(&self, x: i32, y: i32, z: i32) -> Result<BlockType, TerrainError> {
        let chunk = self
            .get_chunk_at(x, z)
            .ok_or(TerrainError::NoChunk { x, y, z })?;
        if !(0..CHUNK_HEIGHT).contains(&y) {
            return Ok(BlockType::EMPTY);
        }
        let chunk = chunk.get();
        let origin = chunk.origin();
        Ok(chunk.block_at(x - origin.x, y, z - origin.y))
    }

    /// Replaces the block at world `(x, y, z)`. The chunk is not re-meshed.
    ///
    /// # Errors
    /// - [`TerrainError::NoChunk`] if no chunk covers `(x, z)`
    /// - [`TerrainError::HeightOutOfRange`] if `y` is outside the world
    pub fn set_block_at(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        block: BlockType,
    ) -> Result<(), TerrainError> {
        let chunk = self
            .get_chunk_at(x, z)
            .ok_or(TerrainError::NoChunk { x, y, z })?;
        if !(0..CHUNK_HEIGHT).contains(&y) {
            return Err(TerrainError::HeightOutOfRange { y });
        }
        let mut chunk = chunk.get_mut();
        let origin = chunk.origin();
        chunk.set_block_at(x - origin.x, y, z - origin.y, block);
        Ok(())
    }

    /// Handles to a chunk and its generated neighbors, taken without locking.
    fn neighborhood(&self, key: ChunkKey) -> Option<ChunkNeighborhood> {
        let entry = self.chunks.get(&key)?;
        let neighbors = entry.links.map(|link| {
            link.and_then(|neighbor| self.chunks.get(&neighbor))
                .filter(|neighbor| neighbor.generated)
                .map(|neighbor| neighbor.chunk.clone())
        });
        Some(ChunkNeighborhood {
            center: entry.chunk.clone(),
            neighbors,
        })
    }

    /// Meshes the chunk with `key` on the calling thread and uploads the result.
    ///
    /// Any worker mesh of this chunk requested before this call is discarded
    /// when it arrives.
    ///
    /// # Returns
    /// `false` if the chunk does not exist or has no block data yet
    pub fn remesh_now(&mut self, key: ChunkKey) -> bool {
        if !self.is_generated(key) {
            return false;
        }
        let Some(neighborhood) = self.neighborhood(key) else {
            return false;
        };
        let mut mesh = neighborhood.extract();
        let Some(entry) = self.chunks.get_mut(&key) else {
            return false;
        };
        mesh.sequence = entry.render.next_sequence();
        entry.render.buffer(&self.buffer_state, &mesh);
        true
    }

    /// Generates and meshes, on the calling thread, every missing chunk within
    /// `chunk_distance` chunks of world column `(x, z)`.
    ///
    /// Generated neighbors of the new chunks are re-meshed too, since their
    /// border faces change.
    pub fn initialize_nearby_chunks(&mut self, x: i32, z: i32, chunk_distance: i32) {
        let center = chunk_origin(x, z);
        let mut created = Vec::new();
        for i in -chunk_distance..=chunk_distance {
            for j in -chunk_distance..=chunk_distance {
                let cx = center.x + i * CHUNK_WIDTH;
                let cz = center.y + j * CHUNK_WIDTH;
                if !self.has_chunk_at(cx, cz) {
                    created.push(self.instantiate_chunk_at(cx, cz));
                }
            }
        }

        for key in &created {
            if let Some(entry) = self.chunks.get_mut(key) {
                entry.chunk.get_mut().generate_terrain();
                entry.generated = true;
            }
        }

        let mut to_mesh: HashSet<ChunkKey> = HashSet::new();
        for key in &created {
            to_mesh.insert(*key);
            if let Some(links) = self.links_of(*key) {
                to_mesh.extend(links.into_iter().flatten());
            }
        }
        let mut meshed = 0;
        for key in to_mesh {
            if self.remesh_now(key) {
                meshed += 1;
            }
        }
        info!(
            "Initialized {} chunk(s) around {}, {} mesh(es) built",
            created.len(),
            coords_string(center),
            meshed
        );
    }

    /// Re-meshes every generated chunk on the calling thread.
    pub fn create_all_chunk_meshes(&mut self) {
        let keys: Vec<ChunkKey> = self
            .chunks
            .iter()
            .filter(|(_, entry)| entry.generated)
            .map(|(key, _)| *key)
            .collect();
        for key in &keys {
            self.remesh_now(*key);
        }
        debug!("Re-meshed {} chunk(s)", keys.len());
    }

    /// Builds the collision test scene: the zone at the origin, empty apart
    /// from grass walls along three of its edges and a central column.
    pub fn create_test_scene(&mut self) {
        let zone = Vector2::new(0, 0);
        let keys: Vec<ChunkKey> = chunks_in_zone(zone)
            .map(|origin| self.instantiate_chunk_at(origin.x, origin.y))
            .collect();
        for key in &keys {
            if let Some(entry) = self.chunks.get_mut(key) {
                entry.generated = true;
            }
        }
        self.generated_zones.insert(to_key(zone.x, zone.y));

        let mut walls = Vec::new();
        for x in 0..64 {
            walls.push((x, 129, 0));
            walls.push((x, 130, 0));
            walls.push((x, 129, 63));
            walls.push((0, 130, x));
        }
        for y in 129..140 {
            walls.push((32, y, 32));
        }
        for (x, y, z) in walls {
            if let Some(chunk) = self.get_chunk_at(x, z) {
                let mut chunk = chunk.get_mut();
                let origin = chunk.origin();
                chunk.set_block_at(x - origin.x, y, z - origin.y, BlockType::GRASS);
            }
        }

        for key in &keys {
            self.remesh_now(*key);
        }
        info!("Test scene created");
    }

    /// Draw records for every buffered chunk whose origin lies in
    /// `[min_x, max_x) × [min_z, max_z)`, stepping by chunk width.
    pub fn draw_list(&self, min_x: i32, max_x: i32, min_z: i32, max_z: i32) -> Vec<ChunkDrawRecord> {
        let start = chunk_origin(min_x, min_z);
        let mut records = Vec::new();
        let mut x = start.x;
        while x < max_x {
            let mut z = start.y;
            while z < max_z {
                if let Some(entry) = self.chunks.get(&to_key(x, z)) {
                    if entry.render.is_buffered() {
                        records.push(entry.render.draw_record(Vector2::new(x, z)));
                    }
                }
                z += CHUNK_WIDTH;
            }
            x += CHUNK_WIDTH;
        }
        records
    }

    /// Draws every buffered chunk in the box, opaque geometry first and
    /// translucent geometry second.
    ///
    /// # Returns
    /// Number of draw calls issued
    pub fn draw(&self, min_x: i32, max_x: i32, min_z: i32, max_z: i32) -> usize {
        let records = self.draw_list(min_x, max_x, min_z, max_z);
        let mut buffer_state = self.buffer_state.get_mut();
        let mut issued = 0;
        for pass in [RenderPass::Opaque, RenderPass::Transparent] {
            for call in records.iter().filter_map(|record| record.draw_call(pass)) {
                buffer_state.draw_indexed(&call);
                issued += 1;
            }
        }
        issued
    }

    /// `"( x, z )"` of the chunk containing world column `(x, z)`.
    pub fn chunk_coords_string(x: i32, z: i32) -> String {
        coords_string(chunk_origin(x, z))
    }

    /// `"( x, z )"` of the zone containing world column `(x, z)`.
    pub fn zone_coords_string(x: i32, z: i32) -> String {
        coords_string(zone_origin(x, z))
    }

    /// Zone key of the zone holding chunk `key`.
    fn zone_of(key: ChunkKey) -> ZoneKey {
        let origin = to_coords(key);
        let zone = zone_origin(origin.x, origin.y);
        to_key(zone.x, zone.y)
    }
}

impl BlockQuery for Terrain {
    fn block_type_at(&self, x: i32, y: i32, z: i32) -> Result<BlockType, TerrainError> {
        self.get_block_at(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::buffer_state::HeadlessBackend;

    pub(crate) fn terrain() -> Terrain {
        let config = TerrainConfig {
            worker_count: 1,
            ..TerrainConfig::default()
        };
        let buffer_state = StResource::new(BufferState::new(Box::new(HeadlessBackend::new())));
        Terrain::new(config, buffer_state)
    }

    #[test]
    fn neighbors_link_both_ways() {
        let mut terrain = terrain();
        let a = terrain.instantiate_chunk_at(0, 0);
        let b = terrain.instantiate_chunk_at(16, 0);
        let c = terrain.instantiate_chunk_at(0, -16);

        let xpos = Direction::XPOS.horizontal_index().unwrap();
        let xneg = Direction::XNEG.horizontal_index().unwrap();
        let zneg = Direction::ZNEG.horizontal_index().unwrap();
        let zpos = Direction::ZPOS.horizontal_index().unwrap();
        assert_eq!(terrain.links_of(a).unwrap()[xpos], Some(b));
        assert_eq!(terrain.links_of(b).unwrap()[xneg], Some(a));
        assert_eq!(terrain.links_of(a).unwrap()[zneg], Some(c));
        assert_eq!(terrain.links_of(c).unwrap()[zpos], Some(a));
        assert_eq!(terrain.links_of(b).unwrap()[zneg], None);
    }

    #[test]
    fn instantiating_twice_keeps_the_first_chunk() {
        let mut terrain = terrain();
        let key = terrain.instantiate_chunk_at(5, 5);
        terrain.set_block_at(5, 5, 5, BlockType::ICE).unwrap();
        assert_eq!(terrain.instantiate_chunk_at(0, 15), key);
        assert_eq!(terrain.get_block_at(5, 5, 5), Ok(BlockType::ICE));
        assert_eq!(terrain.chunk_count(), 1);
    }

    #[test]
    fn negative_coordinates_floor_to_their_chunk() {
        let mut terrain = terrain();
        terrain.instantiate_chunk_at(-1, -1);
        assert!(terrain.has_chunk_at(-16, -16));
        assert!(!terrain.has_chunk_at(0, 0));
        terrain.set_block_at(-1, 7, -16, BlockType::SAND).unwrap();
        let chunk = terrain.get_chunk_at(-8, -8).unwrap();
        assert_eq!(chunk.get().block_at(15, 7, 0), BlockType::SAND);
    }

    #[test]
    fn block_access_errors() {
        let mut terrain = terrain();
        assert_eq!(
            terrain.get_block_at(100, 3, 0),
            Err(TerrainError::NoChunk { x: 100, y: 3, z: 0 })
        );
        terrain.instantiate_chunk_at(0, 0);
        assert_eq!(terrain.get_block_at(0, -1, 0), Ok(BlockType::EMPTY));
        assert_eq!(terrain.get_block_at(0, CHUNK_HEIGHT, 0), Ok(BlockType::EMPTY));
        assert_eq!(
            terrain.set_block_at(0, CHUNK_HEIGHT, 0, BlockType::DIRT),
            Err(TerrainError::HeightOutOfRange { y: CHUNK_HEIGHT })
        );
        assert!(matches!(
            terrain.set_block_at(-1, 0, 0, BlockType::DIRT),
            Err(TerrainError::NoChunk { .. })
        ));
    }

    #[test]
    fn spawn_area_is_generated_and_meshed() {
        let mut terrain = terrain();
        terrain.initialize_nearby_chunks(0, 0, 1);
        assert_eq!(terrain.chunk_count(), 9);
        for key in terrain.chunks.keys() {
            assert!(terrain.is_generated(*key));
            assert!(terrain.is_buffered(*key));
        }
        assert_eq!(terrain.get_block_at(-16, 0, 31), Ok(BlockType::BEDROCK));
        assert_eq!(terrain.draw_list(-16, 32, -16, 32).len(), 9);
    }

    #[test]
    fn test_scene_draws_opaque_pass_only() {
        let mut terrain = terrain();
        terrain.create_test_scene();
        assert_eq!(terrain.chunk_count(), 16);
        assert_eq!(terrain.get_block_at(32, 135, 32), Ok(BlockType::GRASS));
        assert_eq!(terrain.get_block_at(31, 135, 32), Ok(BlockType::EMPTY));

        let records = terrain.draw_list(0, 64, 0, 64);
        assert_eq!(records.len(), 16);
        assert!(records.iter().all(|record| record.ready && record.transparent.is_none()));
        let with_geometry = records.iter().filter(|r| r.opaque.is_some()).count();

        let issued = terrain.draw(0, 64, 0, 64);
        assert_eq!(issued, with_geometry);
        assert_eq!(terrain.buffer_state.get().draw_calls(), issued as u64);
    }

    #[test]
    fn meshing_an_unchanged_chunk_is_idempotent() {
        let mut terrain = terrain();
        terrain.create_test_scene();
        let neighborhood = terrain.neighborhood(to_key(32, 32)).unwrap();
        let mesh = neighborhood.extract();
        assert_eq!(mesh, neighborhood.extract());
        // the column: four sides of eleven blocks plus a top and a bottom
        assert_eq!(mesh.opaque.quad_count(), 4 * 11 + 2);
    }

    #[test]
    fn meshing_skips_neighbors_without_block_data() {
        let mut terrain = terrain();
        let west = terrain.instantiate_chunk_at(0, 0);
        let east = terrain.instantiate_chunk_at(16, 0);
        if let Some(entry) = terrain.chunks.get_mut(&west) {
            entry.generated = true;
        }
        terrain.set_block_at(15, 3, 3, BlockType::STONE).unwrap();

        // the east chunk is empty and not generated, so its border reads as stone
        let neighborhood = terrain.neighborhood(west).unwrap();
        assert!(neighborhood.neighbors.iter().all(Option::is_none));
        assert_eq!(neighborhood.extract().opaque.quad_count(), 5);

        assert!(!terrain.remesh_now(east));
        assert!(!terrain.is_buffered(east));
        assert!(terrain.remesh_now(west));

        if let Some(entry) = terrain.chunks.get_mut(&east) {
            entry.generated = true;
        }
        assert_eq!(terrain.neighborhood(west).unwrap().extract().opaque.quad_count(), 6);
    }

    #[test]
    fn coordinate_strings() {
        assert_eq!(Terrain::chunk_coords_string(-1, 17), "( -16, 16 )");
        assert_eq!(Terrain::zone_coords_string(-1, 17), "( -64, 0 )");
    }
}
