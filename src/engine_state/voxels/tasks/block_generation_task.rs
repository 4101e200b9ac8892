//! # Block Generation Task
//!
//! This module defines the `BlockGenerationTask` which fills every chunk of a
//! zone with terrain on a worker thread. It is scheduled when the streaming
//! window first reaches a zone.

use log::debug;

use crate::{
    core::{MtResource, ResultQueue},
    engine_state::{
        task_management::task::{Task, TaskKind},
        voxels::{
            biome::ColumnSampleCache,
            chunk::Chunk,
            terrain::keys::{to_coords, ChunkKey, ZoneKey},
        },
    },
};

/// A task that generates block data for one zone.
///
/// This task is responsible for:
/// 1. Generating terrain and structures for each of the zone's chunks
/// 2. Publishing the keys of the finished chunks in one batch
pub struct BlockGenerationTask {
    /// Zone being generated
    zone: ZoneKey,
    /// The zone's chunks, already inserted in the terrain's map
    chunks: Vec<MtResource<Chunk>>,
    /// Where finished chunk keys are published
    completed: ResultQueue<ChunkKey>,
}

impl BlockGenerationTask {
    /// Creates a new block generation task.
    ///
    /// # Arguments
    /// * `zone` - Key of the zone
    /// * `chunks` - Shared handles to the zone's chunks
    /// * `completed` - Queue the owner drains for finished chunks
    pub fn new(
        zone: ZoneKey,
        chunks: Vec<MtResource<Chunk>>,
        completed: ResultQueue<ChunkKey>,
    ) -> Self {
        BlockGenerationTask {
            zone,
            chunks,
            completed,
        }
    }
}

impl Task for BlockGenerationTask {
    /// Generates every chunk, each under its own write lock, sharing one
    /// column cache across the zone.
    fn process(&self) {
        let mut columns = ColumnSampleCache::default();
        let mut keys = Vec::with_capacity(self.chunks.len());
        for chunk in &self.chunks {
            let mut chunk = chunk.get_mut();
            chunk.generate_terrain_cached(&mut columns);
            keys.push(chunk.key());
        }

        let origin = to_coords(self.zone);
        debug!(
            "Generated {} chunks for zone ({}, {}), {} columns cached",
            keys.len(),
            origin.x,
            origin.y,
            columns.len()
        );
        self.completed.extend(keys);
    }

    fn kind(&self) -> TaskKind {
        TaskKind::BlockGeneration { zone: self.zone }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::block_type::BlockType;
    use crate::engine_state::voxels::terrain::keys::to_key;

    #[test]
    fn generates_every_chunk_and_reports_it() {
        let chunks = vec![
            MtResource::new(Chunk::new(0, 0)),
            MtResource::new(Chunk::new(16, 0)),
        ];
        let completed = ResultQueue::new();
        let task = BlockGenerationTask::new(to_key(0, 0), chunks.clone(), completed.clone());
        task.process();

        assert_eq!(completed.drain(), vec![to_key(0, 0), to_key(16, 0)]);
        for chunk in &chunks {
            let chunk = chunk.get();
            assert!(chunk.is_generated());
            assert_eq!(chunk.block_at(3, 0, 3), BlockType::BEDROCK);
        }
    }
}
