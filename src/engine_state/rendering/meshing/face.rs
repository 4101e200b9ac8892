use cgmath::Vector3;

use crate::engine_state::rendering::Vertex;
use crate::engine_state::voxels::block::{block_type::BlockType, direction::Direction};

use super::MeshBuffers;

/// Width of one atlas tile in UV space.
const TILE: f32 = 1.0 / 16.0;

/// UV offset of each corner inside its atlas tile, in corner order.
const CORNER_UV_OFFSETS: [[f32; 2]; 4] = [[0.0, 0.0], [TILE, 0.0], [TILE, TILE], [0.0, TILE]];

/// Corner geometry of one block face.
///
/// Corners are unit-cube offsets wound counter-clockwise when seen from
/// outside, so the quad splits into triangles `(0, 1, 2)` and `(0, 2, 3)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockFace {
    /// Which side of the block this face represents
    pub direction: Direction,
    /// Unit-cube corner offsets
    pub corners: [[f32; 3]; 4],
}

/// Every face of a unit block, in [`Direction::MESH_ORDER`].
pub const BLOCK_FACES: [BlockFace; 6] = [
    BlockFace {
        direction: Direction::XPOS,
        corners: [
            [1.0, 0.0, 1.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [1.0, 1.0, 1.0],
        ],
    },
    BlockFace {
        direction: Direction::XNEG,
        corners: [
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 1.0, 1.0],
            [0.0, 1.0, 0.0],
        ],
    },
    BlockFace {
        direction: Direction::ZPOS,
        corners: [
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ],
    },
    BlockFace {
        direction: Direction::ZNEG,
        corners: [
            [1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
        ],
    },
    BlockFace {
        direction: Direction::YPOS,
        corners: [
            [0.0, 1.0, 1.0],
            [1.0, 1.0, 1.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ],
    },
    BlockFace {
        direction: Direction::YNEG,
        corners: [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 0.0, 1.0],
            [0.0, 0.0, 1.0],
        ],
    },
];

impl BlockFace {
    /// Appends this face of the block at local `position` to `mesh`.
    ///
    /// # Arguments
    /// * `mesh` - Buffers to append 4 vertices and 6 indices to
    /// * `position` - Chunk-local block coordinates
    /// * `block` - Block type, selects the atlas tile
    pub fn emit(&self, mesh: &mut MeshBuffers, position: Vector3<i32>, block: BlockType) {
        let Some(uvs) = block.face_uvs() else {
            return;
        };
        let tile = uvs[self.direction.face_index()];
        let base = mesh.vertices.len() as u32;
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);

        let origin = Vector3::new(position.x as f32, position.y as f32, position.z as f32);
        let normal = self.direction.offset();
        for (corner, offset) in self.corners.iter().zip(CORNER_UV_OFFSETS) {
            let uv = [
                tile.u * TILE + offset[0],
                tile.v * TILE + offset[1],
                tile.alpha,
                tile.animated,
            ];
            let corner = Vector3::new(corner[0], corner[1], corner[2]);
            mesh.vertices.push(Vertex::new(origin + corner, normal, uv));
        }
    }
}
