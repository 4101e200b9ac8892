//! Task for generating mesh data for chunks in a background thread.
//!
//! This module contains the `ChunkMeshGenerationTask` which builds vertex and
//! index data for one chunk off the owning thread. Uploading the result is left
//! to the owner, the only thread allowed to touch GPU buffers.

use crate::{
    core::ResultQueue,
    engine_state::{
        rendering::meshing::{ChunkMeshData, ChunkNeighborhood},
        task_management::task::{Task, TaskKind},
        voxels::terrain::keys::ChunkKey,
    },
};

/// A task that extracts the mesh of one chunk.
///
/// This task is responsible for:
/// 1. Locking the chunk and its linked neighbors for reading
/// 2. Running face-culled mesh extraction
/// 3. Publishing the CPU-side buffers before releasing the locks
pub struct ChunkMeshGenerationTask {
    /// Key of the chunk being meshed
    chunk: ChunkKey,
    /// Request order stamped by the owner
    sequence: u64,
    /// The chunk and the neighbors its border faces depend on
    neighborhood: ChunkNeighborhood,
    /// Where finished meshes are published
    completed: ResultQueue<ChunkMeshData>,
}

impl ChunkMeshGenerationTask {
    /// Creates a new chunk mesh generation task.
    ///
    /// The chunk is not locked here, so creating a task never waits on a
    /// worker that is still filling it.
    ///
    /// # Arguments
    /// * `chunk` - Key of the chunk at the center of `neighborhood`
    /// * `sequence` - Request order, copied onto the finished mesh
    /// * `neighborhood` - Shared handles to the chunk and its neighbors
    /// * `completed` - Queue the owner drains for finished meshes
    pub fn new(
        chunk: ChunkKey,
        sequence: u64,
        neighborhood: ChunkNeighborhood,
        completed: ResultQueue<ChunkMeshData>,
    ) -> Self {
        ChunkMeshGenerationTask {
            chunk,
            sequence,
            neighborhood,
            completed,
        }
    }
}

impl Task for ChunkMeshGenerationTask {
    fn process(&self) {
        self.neighborhood.extract_with(|mut mesh| {
            mesh.sequence = self.sequence;
            self.completed.push(mesh);
        });
    }

    fn kind(&self) -> TaskKind {
        TaskKind::MeshExtraction { chunk: self.chunk }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MtResource;
    use crate::engine_state::voxels::block::block_type::BlockType;
    use crate::engine_state::voxels::chunk::Chunk;
    use crate::engine_state::voxels::terrain::keys::to_key;

    #[test]
    fn publishes_mesh_for_its_chunk() {
        let mut chunk = Chunk::new(-16, 0);
        chunk.set_block_at(1, 1, 1, BlockType::LAVA);
        let completed = ResultQueue::new();
        let task = ChunkMeshGenerationTask::new(
            to_key(-16, 0),
            7,
            ChunkNeighborhood {
                center: MtResource::new(chunk),
                neighbors: [None, None, None, None],
            },
            completed.clone(),
        );
        assert_eq!(
            task.kind(),
            TaskKind::MeshExtraction {
                chunk: to_key(-16, 0)
            }
        );

        task.process();
        let meshes = completed.drain();
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].key, to_key(-16, 0));
        assert_eq!(meshes[0].sequence, 7);
        assert_eq!(meshes[0].transparent.quad_count(), 6);
        assert!(meshes[0].opaque.is_empty());
    }
}
