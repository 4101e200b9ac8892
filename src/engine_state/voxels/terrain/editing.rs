//! Player block edits: digging and placing along the view ray.
//!
//! Edits are applied and re-meshed on the calling thread so the change shows
//! on the next frame. When the edited block sits on a chunk border, the chunk
//! across that border is re-meshed as well.

use cgmath::{InnerSpace, Vector3};
use log::debug;

use super::keys::{chunk_origin, to_key, ChunkKey};
use super::Terrain;
use crate::engine_state::voxels::block::block_type::BlockType;
use crate::engine_state::voxels::chunk::CHUNK_WIDTH;
use crate::engine_state::voxels::ray_march::grid_march;
use crate::error::TerrainError;

/// How far the player can reach, in blocks.
pub const REACH: f32 = 4.5;

impl Terrain {
    /// Removes the first non-empty block within `reach` along `look`.
    ///
    /// # Arguments
    /// * `origin` - Eye position
    /// * `look` - View direction; only its direction matters
    /// * `reach` - Search distance
    ///
    /// # Returns
    /// The cleared cell, or `None` if nothing was in reach
    ///
    /// # Errors
    /// Propagates [`TerrainError`] from the ray march.
    pub fn dig(
        &mut self,
        origin: Vector3<f32>,
        look: Vector3<f32>,
        reach: f32,
    ) -> Result<Option<Vector3<i32>>, TerrainError> {
        let Some(hit) = grid_march(origin, scaled(look, reach), &*self, |found| {
            found != BlockType::EMPTY
        })?
        else {
            return Ok(None);
        };

        let cell = hit.cell;
        self.set_block_at(cell.x, cell.y, cell.z, BlockType::EMPTY)?;
        self.remesh_around(cell);
        debug!("Dug block at ({}, {}, {})", cell.x, cell.y, cell.z);
        Ok(Some(cell))
    }

    /// Places `block` in the empty cell in front of the first non-empty block
    /// within `reach` along `look`.
    ///
    /// # Returns
    /// The filled cell, or `None` if nothing was in reach or the cell in front
    /// of the hit face is occupied
    ///
    /// # Errors
    /// Propagates [`TerrainError`] from the ray march, and
    /// [`TerrainError::HeightOutOfRange`] when the target is above the world.
    pub fn place(
        &mut self,
        origin: Vector3<f32>,
        look: Vector3<f32>,
        reach: f32,
        block: BlockType,
    ) -> Result<Option<Vector3<i32>>, TerrainError> {
        let Some(hit) = grid_march(origin, scaled(look, reach), &*self, |found| {
            found != BlockType::EMPTY
        })?
        else {
            return Ok(None);
        };

        let cell = hit.cell + hit.entered_face.offset();
        if self.get_block_at(cell.x, cell.y, cell.z)? != BlockType::EMPTY {
            return Ok(None);
        }
        self.set_block_at(cell.x, cell.y, cell.z, block)?;
        self.remesh_around(cell);
        debug!(
            "Placed {:?} at ({}, {}, {})",
            block, cell.x, cell.y, cell.z
        );
        Ok(Some(cell))
    }

    /// Re-meshes the chunk holding world `cell`, and any chunk it borders.
    fn remesh_around(&mut self, cell: Vector3<i32>) {
        let origin = chunk_origin(cell.x, cell.z);
        let local_x = cell.x - origin.x;
        let local_z = cell.z - origin.y;

        let mut keys: Vec<ChunkKey> = vec![to_key(origin.x, origin.y)];
        if local_x == 0 {
            keys.push(to_key(origin.x - CHUNK_WIDTH, origin.y));
        }
        if local_x == CHUNK_WIDTH - 1 {
            keys.push(to_key(origin.x + CHUNK_WIDTH, origin.y));
        }
        if local_z == 0 {
            keys.push(to_key(origin.x, origin.y - CHUNK_WIDTH));
        }
        if local_z == CHUNK_WIDTH - 1 {
            keys.push(to_key(origin.x, origin.y + CHUNK_WIDTH));
        }

        for key in keys {
            self.remesh_now(key);
        }
    }
}

/// `look` stretched to length `reach`.
fn scaled(look: Vector3<f32>, reach: f32) -> Vector3<f32> {
    if look.magnitude2() > 0.0 {
        look.normalize_to(reach)
    } else {
        look
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainConfig;
    use crate::core::StResource;
    use crate::engine_state::buffer_state::{BufferState, HeadlessBackend};

    fn scene() -> Terrain {
        let config = TerrainConfig {
            worker_count: 1,
            ..TerrainConfig::default()
        };
        let buffer_state = StResource::new(BufferState::new(Box::new(HeadlessBackend::new())));
        let mut terrain = Terrain::new(config, buffer_state);
        terrain.create_test_scene();
        terrain
    }

    #[test]
    fn dig_clears_the_block_in_front() {
        let mut terrain = scene();
        // facing the central column from two blocks west
        let eye = Vector3::new(30.5, 135.5, 32.5);
        let dug = terrain.dig(eye, Vector3::new(1.0, 0.0, 0.0), REACH).unwrap();
        assert_eq!(dug, Some(Vector3::new(32, 135, 32)));
        assert_eq!(terrain.get_block_at(32, 135, 32), Ok(BlockType::EMPTY));
    }

    #[test]
    fn dig_out_of_reach_changes_nothing() {
        let mut terrain = scene();
        let eye = Vector3::new(20.5, 135.5, 32.5);
        let dug = terrain.dig(eye, Vector3::new(1.0, 0.0, 0.0), REACH).unwrap();
        assert_eq!(dug, None);
        assert_eq!(terrain.get_block_at(32, 135, 32), Ok(BlockType::GRASS));
    }

    #[test]
    fn place_fills_the_cell_before_the_hit_face() {
        let mut terrain = scene();
        let eye = Vector3::new(30.5, 135.5, 32.5);
        let placed = terrain
            .place(eye, Vector3::new(1.0, 0.0, 0.0), REACH, BlockType::COBBLESTONE)
            .unwrap();
        assert_eq!(placed, Some(Vector3::new(31, 135, 32)));
        assert_eq!(terrain.get_block_at(31, 135, 32), Ok(BlockType::COBBLESTONE));
    }

    #[test]
    fn placing_on_a_chunk_border_remeshes_the_neighbor() {
        let mut terrain = scene();
        // the column sits at local x = 0 of chunk (32, 32); build against its
        // west face, which lands in chunk (16, 32)
        let opaque_indices = |terrain: &Terrain| {
            terrain.draw_list(32, 48, 32, 48)[0]
                .opaque
                .map_or(0, |mesh| mesh.index_count)
        };
        let before = opaque_indices(&terrain);
        let eye = Vector3::new(29.5, 131.5, 32.5);
        let placed = terrain
            .place(eye, Vector3::new(1.0, 0.0, 0.0), REACH, BlockType::SAND)
            .unwrap();
        assert_eq!(placed, Some(Vector3::new(31, 131, 32)));
        assert_eq!(terrain.get_block_at(31, 131, 32), Ok(BlockType::SAND));
        // the column's west face behind the sand is now hidden
        assert_eq!(opaque_indices(&terrain), before - 6);
    }

    #[test]
    fn looking_straight_down_onto_open_floor_hits_nothing() {
        let mut terrain = scene();
        let eye = Vector3::new(10.5, 135.5, 10.5);
        assert_eq!(terrain.dig(eye, Vector3::new(0.0, -1.0, 0.0), REACH), Ok(None));
    }
}
