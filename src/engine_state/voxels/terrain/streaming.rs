//! Zone streaming: which zones get generated, meshed, or freed as the player
//! moves, and how finished worker output is folded back in.
//!
//! A zone moves through these states, driven only by [`Terrain::multithread`]:
//!
//! ```text
//! unknown -> block data pending -> block data ready -> mesh pending -> visible
//!                                                                        |
//!                                       (leaves range) mesh freed <------+
//! ```
//!
//! A zone is marked generated the moment its generation task is published, and
//! its chunks are inserted into the map in the same call, so a zone is never
//! generated twice.

use std::collections::HashSet;

use cgmath::Vector3;
use log::{debug, info, warn};

use super::keys::{bordering_zones, chunks_in_zone, coords_string, to_coords, to_key, zone_at, ChunkKey, ZoneKey};
use super::Terrain;
use crate::engine_state::rendering::tasks::chunk_mesh_generation_task::ChunkMeshGenerationTask;
use crate::engine_state::task_management::task::TaskKind;
use crate::engine_state::voxels::tasks::block_generation_task::BlockGenerationTask;

impl Terrain {
    /// Per-frame streaming entry point.
    ///
    /// Every `dispatch_interval` seconds, dispatches work for zones that entered
    /// range and frees zones that left it. Every call drains finished work.
    ///
    /// # Arguments
    /// * `pos` - Player position this frame
    /// * `prev_pos` - Player position last frame
    /// * `dt` - Seconds since last frame
    pub fn multithread(&mut self, pos: Vector3<f32>, prev_pos: Vector3<f32>, dt: f32) {
        self.new_chunk_timer += dt;
        if self.new_chunk_timer >= self.config.dispatch_interval {
            self.try_new_chunk(pos, prev_pos);
            self.new_chunk_timer = 0.0;
        }
        self.check_thread_results();
    }

    /// Dispatches work for the zones within range of `pos` and frees the meshes
    /// of zones that fell out of range.
    pub fn try_new_chunk(&mut self, pos: Vector3<f32>, prev_pos: Vector3<f32>) {
        let radius = self.config.create_radius;
        let in_range = bordering_zones(zone_at(pos.x, pos.z), radius);

        let mut was_in_range = self.active_zones.clone();
        was_in_range.extend(bordering_zones(zone_at(prev_pos.x, prev_pos.z), radius));
        for zone in was_in_range.difference(&in_range) {
            self.free_zone(*zone);
        }

        for zone in &in_range {
            let newly_in_range = !self.active_zones.contains(zone);
            let retry = newly_in_range && self.failed_zones.contains(zone);
            if !self.generated_zones.contains(zone) || retry {
                self.dispatch_block_generation(*zone);
            } else if newly_in_range {
                self.dispatch_zone_meshes(*zone);
            }
        }

        self.active_zones = in_range;
    }

    /// Inserts a zone's chunks and publishes one generation task for those
    /// that have no block data yet. Chunks that already have block data (from
    /// spawn initialization or a failed earlier attempt) are meshed instead.
    fn dispatch_block_generation(&mut self, zone: ZoneKey) {
        self.failed_zones.remove(&zone);
        self.generated_zones.insert(zone);

        let keys: Vec<ChunkKey> = chunks_in_zone(to_coords(zone))
            .map(|origin| self.instantiate_chunk_at(origin.x, origin.y))
            .collect();

        let mut pending = Vec::new();
        let mut ready = Vec::new();
        for key in keys {
            match self.chunks.get(&key) {
                Some(entry) if entry.generated => ready.push(key),
                Some(entry) => pending.push(entry.chunk.clone()),
                None => {}
            }
        }

        info!(
            "Dispatching block generation for zone {}: {} chunk(s) to generate, {} ready",
            coords_string(to_coords(zone)),
            pending.len(),
            ready.len()
        );
        if !pending.is_empty() {
            self.stats.block_tasks_dispatched += 1;
            self.task_manager.publish_task(Box::new(BlockGenerationTask::new(
                zone,
                pending,
                self.block_data_results.clone(),
            )));
        }
        for key in ready {
            if !self.is_buffered(key) {
                self.dispatch_mesh(key);
            }
        }
    }

    /// Publishes mesh tasks for every generated chunk of a zone.
    fn dispatch_zone_meshes(&mut self, zone: ZoneKey) {
        let keys: Vec<ChunkKey> = chunks_in_zone(to_coords(zone))
            .map(|origin| to_key(origin.x, origin.y))
            .filter(|key| self.is_generated(*key))
            .collect();
        debug!(
            "Dispatching {} mesh task(s) for zone {}",
            keys.len(),
            coords_string(to_coords(zone))
        );
        for key in keys {
            self.dispatch_mesh(key);
        }
    }

    /// Publishes a mesh task for one chunk, stamped with the chunk's next
    /// mesh sequence.
    fn dispatch_mesh(&mut self, key: ChunkKey) {
        let Some(neighborhood) = self.neighborhood(key) else {
            return;
        };
        let Some(entry) = self.chunks.get_mut(&key) else {
            return;
        };
        let sequence = entry.render.next_sequence();
        self.stats.mesh_tasks_dispatched += 1;
        self.task_manager.publish_task(Box::new(ChunkMeshGenerationTask::new(
            key,
            sequence,
            neighborhood,
            self.mesh_results.clone(),
        )));
    }

    /// Frees the meshes of every chunk in a zone. Block data is kept.
    fn free_zone(&mut self, zone: ZoneKey) {
        let mut freed = 0;
        for origin in chunks_in_zone(to_coords(zone)) {
            if let Some(entry) = self.chunks.get_mut(&to_key(origin.x, origin.y)) {
                if entry.render.is_buffered() {
                    entry.render.free();
                    freed += 1;
                }
            }
        }
        if freed > 0 {
            self.stats.meshes_freed += freed;
            debug!(
                "Freed {} mesh(es) in zone {}",
                freed,
                coords_string(to_coords(zone))
            );
        }
    }

    /// Drains worker output: failures first, then block data, then meshes.
    ///
    /// Fresh block data changes the border faces of the chunks around it, so
    /// each generated chunk and its linked neighbors are queued for meshing.
    /// Meshes are uploaded unless their zone has left range or a mesh requested
    /// after them is already showing. Requests are ordered by sequence rather
    /// than by the chunk's block revision, since an edit next door changes a
    /// chunk's border faces without touching its blocks.
    pub fn check_thread_results(&mut self) {
        for failure in self.task_manager.process_completed_tasks() {
            self.stats.failed_tasks += 1;
            match failure.kind {
                TaskKind::BlockGeneration { zone } => {
                    warn!("{failure}; zone will be retried when it re-enters range");
                    self.failed_zones.insert(zone);
                }
                TaskKind::MeshExtraction { .. } => warn!("{failure}"),
            }
        }

        let generated = self.block_data_results.drain();
        if !generated.is_empty() {
            let mut to_mesh: HashSet<ChunkKey> = HashSet::new();
            for key in &generated {
                if let Some(entry) = self.chunks.get_mut(key) {
                    entry.generated = true;
                    to_mesh.insert(*key);
                    to_mesh.extend(entry.links.into_iter().flatten());
                }
            }
            let to_mesh: Vec<ChunkKey> = to_mesh
                .into_iter()
                .filter(|key| {
                    self.is_generated(*key) && self.active_zones.contains(&Self::zone_of(*key))
                })
                .collect();
            debug!(
                "{} chunk(s) generated, {} mesh task(s) queued",
                generated.len(),
                to_mesh.len()
            );
            for key in to_mesh {
                self.dispatch_mesh(key);
            }
        }

        for mesh in self.mesh_results.drain() {
            let Some(entry) = self.chunks.get_mut(&mesh.key) else {
                continue;
            };
            let out_of_range = !self.active_zones.contains(&Self::zone_of(mesh.key));
            if out_of_range || entry.render.is_superseded(mesh.sequence) {
                debug!(
                    "Discarding mesh of chunk {} (block revision {}, request {})",
                    coords_string(to_coords(mesh.key)),
                    mesh.revision,
                    mesh.sequence
                );
                self.stats.stale_meshes_discarded += 1;
                continue;
            }
            entry.render.buffer(&self.buffer_state, &mesh);
            self.stats.meshes_uploaded += 1;
        }
    }

    /// Zones inside the streaming window as of the last dispatch.
    pub fn active_zones(&self) -> &HashSet<ZoneKey> {
        &self.active_zones
    }

    /// Whether a generation task has been dispatched for `zone`.
    pub fn is_zone_generated(&self, zone: ZoneKey) -> bool {
        self.generated_zones.contains(&zone)
    }
}
