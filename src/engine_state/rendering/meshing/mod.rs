//! Mesh extraction for terrain chunks.
//!
//! This module turns a chunk's block grid into interleaved vertex and index
//! buffers. Meshing is face-culled: every visible face of every solid or
//! translucent block becomes one quad, and faces pressed against an opaque
//! block are skipped.
//!
//! # Architecture
//! - `extract_mesh`: the pure mesher over a chunk and its four horizontal neighbors
//! - `ChunkNeighborhood`: shared handles to a chunk and its neighbors, locked for
//!   reading while a worker meshes them
//! - `face`: per-face corner geometry and quad emission
//!
//! # Culling Rules
//! - A face is skipped when the block beside it is opaque
//! - A translucent block's face is also skipped when the block beside it is
//!   translucent, so water and ice show no internal seams
//! - Beside an unlinked chunk edge the missing block counts as stone; above the
//!   top and below the bottom of the world it counts as empty
//!
//! # Performance Considerations
//! - Extraction is a single x, y, z sweep with no allocation beyond the output
//! - Output goes to one of two buffers by the block's translucency, so the
//!   renderer can draw opaque geometry first and translucent geometry second

use cgmath::Vector3;

use crate::core::MtResource;
use crate::engine_state::voxels::block::block_type::BlockType;
use crate::engine_state::voxels::chunk::{Chunk, CHUNK_HEIGHT, CHUNK_WIDTH};
use crate::engine_state::voxels::terrain::keys::ChunkKey;

use super::Vertex;

mod face;

pub use face::{BlockFace, BLOCK_FACES};

/// Index and interleaved vertex data of one mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffers {
    /// Triangle list indices into `vertices`
    pub indices: Vec<u32>,
    /// Interleaved vertices
    pub vertices: Vec<Vertex>,
}

impl MeshBuffers {
    /// Number of quads, four vertices each.
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    /// Returns `true` if the mesh has no geometry.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// A finished mesh, handed from a worker to the owning thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkMeshData {
    /// Chunk the mesh belongs to
    pub key: ChunkKey,
    /// Revision of the chunk's blocks the mesh was built from
    pub revision: u64,
    /// Owner-assigned order of the request that produced this mesh
    pub sequence: u64,
    /// Geometry for the opaque pass
    pub opaque: MeshBuffers,
    /// Geometry for the translucent pass
    pub transparent: MeshBuffers,
}

/// Neighbor chunks indexed by [`Direction::horizontal_index`](crate::engine_state::voxels::block::direction::Direction::horizontal_index).
pub type NeighborBlocks<'a> = [Option<&'a Chunk>; 4];

/// Block beside local `position` in `direction`'s offset, looking into the
/// linked neighbor when the step leaves the chunk horizontally.
fn adjacent_block(
    chunk: &Chunk,
    neighbors: &NeighborBlocks,
    face: &BlockFace,
    position: Vector3<i32>,
) -> BlockType {
    let p = position + face.direction.offset();
    let outside_horizontally = !(0..CHUNK_WIDTH).contains(&p.x) || !(0..CHUNK_WIDTH).contains(&p.z);
    if outside_horizontally {
        let neighbor = face
            .direction
            .horizontal_index()
            .and_then(|slot| neighbors[slot]);
        return match neighbor {
            Some(neighbor) => neighbor.block_at(
                p.x.rem_euclid(CHUNK_WIDTH),
                p.y,
                p.z.rem_euclid(CHUNK_WIDTH),
            ),
            None => BlockType::STONE,
        };
    }
    if !(0..CHUNK_HEIGHT).contains(&p.y) {
        return BlockType::EMPTY;
    }
    chunk.block_at(p.x, p.y, p.z)
}

/// Builds the opaque and translucent meshes of `chunk`.
///
/// # Arguments
/// * `chunk` - Chunk to mesh
/// * `neighbors` - Linked horizontal neighbors, consulted for border faces
///
/// # Returns
/// Mesh data tagged with the chunk's key and current revision
pub fn extract_mesh(chunk: &Chunk, neighbors: &NeighborBlocks) -> ChunkMeshData {
    let mut opaque = MeshBuffers::default();
    let mut transparent = MeshBuffers::default();

    for x in 0..CHUNK_WIDTH {
        for y in 0..CHUNK_HEIGHT {
            for z in 0..CHUNK_WIDTH {
                let block = chunk.block_at(x, y, z);
                let is_transparent = block.is_transparent();
                if !block.is_solid() && !is_transparent {
                    continue;
                }
                let target = if is_transparent {
                    &mut transparent
                } else {
                    &mut opaque
                };

                let position = Vector3::new(x, y, z);
                for face in &BLOCK_FACES {
                    let beside = adjacent_block(chunk, neighbors, face, position);
                    if beside.is_solid() {
                        continue;
                    }
                    if is_transparent && beside.is_transparent() {
                        continue;
                    }
                    face.emit(target, position, block);
                }
            }
        }
    }

    ChunkMeshData {
        key: chunk.key(),
        revision: chunk.revision(),
        sequence: 0,
        opaque,
        transparent,
    }
}

/// Shared handles to a chunk and its linked neighbors.
///
/// Built on the owning thread and moved into a mesh worker, which locks every
/// chunk for reading while it extracts.
#[derive(Clone)]
pub struct ChunkNeighborhood {
    /// Chunk to mesh
    pub center: MtResource<Chunk>,
    /// Linked neighbors by horizontal slot
    pub neighbors: [Option<MtResource<Chunk>>; 4],
}

impl ChunkNeighborhood {
    /// Locks the chunk and its neighbors for reading and meshes the chunk.
    ///
    /// `on_extracted` runs while the locks are still held, so a result is
    /// published before any writer can change the blocks it was built from.
    pub fn extract_with<R>(&self, on_extracted: impl FnOnce(ChunkMeshData) -> R) -> R {
        let center = self.center.get();
        let guards = self
            .neighbors
            .each_ref()
            .map(|neighbor| neighbor.as_ref().map(|chunk| chunk.get()));
        let neighbors: NeighborBlocks = guards.each_ref().map(|guard| guard.as_deref());
        on_extracted(extract_mesh(&center, &neighbors))
    }

    /// Locks and meshes, returning the result.
    pub fn extract(&self) -> ChunkMeshData {
        self.extract_with(|mesh| mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(x: i32, z: i32, top: i32, block: BlockType) -> Chunk {
        let mut chunk = Chunk::new(x, z);
        chunk.generate_columns_with(|chunk, cx, cz| {
            for y in 0..=top {
                chunk.set_block_at(cx, y, cz, block);
            }
        });
        chunk
    }

    #[test]
    fn single_block_emits_six_faces() {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_block_at(5, 40, 5, BlockType::DIRT);
        let mesh = extract_mesh(&chunk, &[None; 4]);
        assert_eq!(mesh.opaque.quad_count(), 6);
        assert_eq!(mesh.opaque.indices.len(), 36);
        assert!(mesh.transparent.is_empty());
    }

    #[test]
    fn translucent_blocks_hide_shared_faces() {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_block_at(5, 40, 5, BlockType::WATER);
        chunk.set_block_at(6, 40, 5, BlockType::ICE);
        chunk.set_block_at(5, 39, 5, BlockType::STONE);
        let mesh = extract_mesh(&chunk, &[None; 4]);
        // water: 6 minus the ice side minus the stone below; ice: 6 minus the water side
        assert_eq!(mesh.transparent.quad_count(), 4 + 5);
        // the stone keeps its top face, which is pressed against water
        assert_eq!(mesh.opaque.quad_count(), 6);
    }

    #[test]
    fn linked_neighbor_is_consulted_at_the_border() {
        let chunk = filled(0, 0, 3, BlockType::STONE);
        let empty = Chunk::new(16, 0);
        let unlinked = extract_mesh(&chunk, &[None; 4]);
        let linked = extract_mesh(&chunk, &[Some(&empty), None, None, None]);
        assert_eq!(
            linked.opaque.quad_count() - unlinked.opaque.quad_count(),
            (CHUNK_WIDTH * 4) as usize
        );
    }

    #[test]
    fn neighborhood_extraction_matches_direct_extraction() {
        let center = MtResource::new(filled(0, 0, 8, BlockType::SAND));
        let east = MtResource::new(Chunk::new(16, 0));
        let neighborhood = ChunkNeighborhood {
            center: center.clone(),
            neighbors: [Some(east.clone()), None, None, None],
        };
        let expected = extract_mesh(&center.get(), &[Some(&east.get()), None, None, None]);
        assert_eq!(neighborhood.extract(), expected);
    }
}
