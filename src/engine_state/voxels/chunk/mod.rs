//! # Chunk Module
//!
//! A chunk is a 16 × 256 × 16 column of blocks covering world
//! `[x, x + 16) × [0, 256) × [z, z + 16)`, where `(x, z)` is its origin and both
//! are multiples of 16.
//!
//! ## Storage
//!
//! Blocks are stored densely, one byte each, at index `x + 16·y + 16·256·z` of
//! local coordinates. A chunk is allocated empty; its terrain is filled in by
//! [`generate_terrain`](Chunk::generate_terrain), usually on a worker thread
//! (see `generation`).
//!
//! ## Revisions
//!
//! Every mutation after allocation bumps the chunk's revision. Meshes are tagged
//! with the revision they were built from, which lets the terrain discard a
//! mesh that was computed from block data older than the mesh it already shows.

use cgmath::{Vector2, Vector3};

use super::block::block_type::BlockType;
use super::terrain::keys::{to_key, ChunkKey};

pub mod generation;

/// Side length of a chunk along x and z.
pub const CHUNK_WIDTH: i32 = 16;
/// Height of a chunk (and of the world).
pub const CHUNK_HEIGHT: i32 = 256;
/// Number of blocks in a chunk.
pub const CHUNK_VOLUME: usize = (CHUNK_WIDTH * CHUNK_HEIGHT * CHUNK_WIDTH) as usize;

/// Dense block storage for one 16 × 256 × 16 column of the world.
#[derive(Clone)]
pub struct Chunk {
    origin: Vector2<i32>,
    blocks: Box<[BlockType]>,
    generated: bool,
    revision: u64,
}

impl Chunk {
    /// Allocates an empty, ungenerated chunk.
    ///
    /// # Arguments
    /// * `x`, `z` - World coordinates of the chunk's minimum corner
    pub fn new(x: i32, z: i32) -> Self {
        debug_assert!(
            x.rem_euclid(CHUNK_WIDTH) == 0 && z.rem_euclid(CHUNK_WIDTH) == 0,
            "chunk origin ({x}, {z}) is not aligned"
        );
        Chunk {
            origin: Vector2::new(x, z),
            blocks: vec![BlockType::EMPTY; CHUNK_VOLUME].into_boxed_slice(),
            generated: false,
            revision: 0,
        }
    }

    /// World `(x, z)` of the minimum corner.
    pub fn origin(&self) -> Vector2<i32> {
        self.origin
    }

    /// Key of this chunk in the terrain's chunk map.
    pub fn key(&self) -> ChunkKey {
        to_key(self.origin.x, self.origin.y)
    }

    /// Whether terrain generation has completed for this chunk.
    pub fn is_generated(&self) -> bool {
        self.generated
    }

    /// Counter bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns `true` if local `(x, y, z)` lies inside the chunk.
    pub fn contains_local(x: i32, y: i32, z: i32) -> bool {
        (0..CHUNK_WIDTH).contains(&x)
            && (0..CHUNK_HEIGHT).contains(&y)
            && (0..CHUNK_WIDTH).contains(&z)
    }

    /// Linear storage index of local `(x, y, z)`.
    ///
    /// # Panics
    /// Debug builds panic on coordinates outside the chunk.
    #[inline]
    pub fn index(x: i32, y: i32, z: i32) -> usize {
        debug_assert!(
            Self::contains_local(x, y, z),
            "local coordinates ({x}, {y}, {z}) outside chunk"
        );
        (x + CHUNK_WIDTH * y + CHUNK_WIDTH * CHUNK_HEIGHT * z) as usize
    }

    /// Inverse of [`index`](Self::index).
    pub fn local_coords(index: usize) -> Vector3<i32> {
        let index = index as i32;
        let x = index % CHUNK_WIDTH;
        let y = (index / CHUNK_WIDTH) % CHUNK_HEIGHT;
        let z = index / (CHUNK_WIDTH * CHUNK_HEIGHT);
        Vector3::new(x, y, z)
    }

    /// Block at local `(x, y, z)`.
    ///
    /// # Panics
    /// Panics if the coordinates lie outside the chunk.
    #[inline]
    pub fn block_at(&self, x: i32, y: i32, z: i32) -> BlockType {
        self.blocks[Self::index(x, y, z)]
    }

    /// Replaces the block at local `(x, y, z)` and bumps the revision.
    ///
    /// # Panics
    /// Panics if the coordinates lie outside the chunk.
    pub fn set_block_at(&mut self, x: i32, y: i32, z: i32, block: BlockType) {
        self.blocks[Self::index(x, y, z)] = block;
        self.revision += 1;
    }

    /// Writes without bumping the revision; generation bumps once at the end.
    #[inline]
    fn put(&mut self, x: i32, y: i32, z: i32, block: BlockType) {
        self.blocks[Self::index(x, y, z)] = block;
    }

    /// Counts blocks of one type, mostly for tests and statistics.
    pub fn count_blocks(&self, block: BlockType) -> usize {
        self.blocks.iter().filter(|b| **b == block).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_chunk_is_empty_and_ungenerated() {
        let chunk = Chunk::new(-32, 48);
        assert_eq!(chunk.count_blocks(BlockType::EMPTY), CHUNK_VOLUME);
        assert!(!chunk.is_generated());
        assert_eq!(chunk.origin(), Vector2::new(-32, 48));
        assert_eq!(chunk.key(), to_key(-32, 48));
    }

    #[test]
    fn set_block_bumps_revision() {
        let mut chunk = Chunk::new(0, 0);
        chunk.set_block_at(15, 255, 15, BlockType::SNOW);
        assert_eq!(chunk.block_at(15, 255, 15), BlockType::SNOW);
        assert_eq!(chunk.revision(), 1);
        assert_eq!(Chunk::index(15, 255, 15), CHUNK_VOLUME - 1);
    }

    #[test]
    #[should_panic]
    fn out_of_range_local_access_panics() {
        let chunk = Chunk::new(0, 0);
        chunk.block_at(0, CHUNK_HEIGHT, CHUNK_WIDTH - 1);
    }

    proptest! {
        #[test]
        fn index_is_a_bijection(x in 0..CHUNK_WIDTH, y in 0..CHUNK_HEIGHT, z in 0..CHUNK_WIDTH) {
            let index = Chunk::index(x, y, z);
            prop_assert!(index < CHUNK_VOLUME);
            prop_assert_eq!(Chunk::local_coords(index), Vector3::new(x, y, z));
        }
    }
}
