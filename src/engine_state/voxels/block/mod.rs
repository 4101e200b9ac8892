//! # Block Module
//!
//! Block type definitions and the static per-block tables derived from them:
//! texture-atlas placement per face, solidity and transparency for meshing, and
//! the physics properties the player controller queries.

use block_type::BlockType;
use phf::phf_map;

pub mod block_type;
pub mod direction;

/// The underlying integer type used to represent block types in memory.
pub type BlockTypeSize = u8;

/// Atlas placement of one block face.
///
/// `u` and `v` are tile coordinates in the 16×16 texture atlas. `alpha` is 1 for
/// opaque blocks and strictly between 0 and 1 for translucent ones. `animated`
/// is 1 for faces whose texture scrolls (liquids).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FaceUv {
    /// Atlas column
    pub u: f32,
    /// Atlas row
    pub v: f32,
    /// Opacity
    pub alpha: f32,
    /// Animation flag, 0 or 1
    pub animated: f32,
}

impl FaceUv {
    const fn opaque(u: f32, v: f32) -> Self {
        Self {
            u,
            v,
            alpha: 1.0,
            animated: 0.0,
        }
    }

    const fn translucent(u: f32, v: f32, animated: f32) -> Self {
        Self {
            u,
            v,
            alpha: 0.5,
            animated,
        }
    }
}

const fn all_faces(face: FaceUv) -> [FaceUv; 6] {
    [face; 6]
}

/// Faces laid out as `[XPOS, XNEG, YPOS, YNEG, ZPOS, ZNEG]`.
const fn sided_faces(side: FaceUv, top: FaceUv, bottom: FaceUv) -> [FaceUv; 6] {
    [side, side, top, bottom, side, side]
}

/// Per-block face table keyed by block id, faces in
/// [`Direction::face_index`](direction::Direction::face_index) order.
///
/// `EMPTY` has no entry: it has no faces and is neither solid nor translucent.
pub static BLOCK_FACE_TABLE: phf::Map<BlockTypeSize, [FaceUv; 6]> = phf_map! {
    // GRASS
    1u8 => sided_faces(
        FaceUv::opaque(3.0, 15.0),
        FaceUv::opaque(8.0, 13.0),
        FaceUv::opaque(2.0, 15.0),
    ),
    // DIRT
    2u8 => all_faces(FaceUv::opaque(2.0, 15.0)),
    // STONE
    3u8 => all_faces(FaceUv::opaque(1.0, 15.0)),
    // WATER
    4u8 => all_faces(FaceUv::translucent(14.0, 3.0, 1.0)),
    // SNOW
    5u8 => all_faces(FaceUv::opaque(2.0, 11.0)),
    // LAVA
    6u8 => all_faces(FaceUv::translucent(14.0, 1.0, 1.0)),
    // BEDROCK
    7u8 => all_faces(FaceUv::opaque(1.0, 14.0)),
    // ICE
    8u8 => all_faces(FaceUv::translucent(3.0, 11.0, 0.0)),
    // WOOD
    9u8 => sided_faces(
        FaceUv::opaque(4.0, 14.0),
        FaceUv::opaque(5.0, 14.0),
        FaceUv::opaque(5.0, 14.0),
    ),
    // LEAF
    10u8 => all_faces(FaceUv::opaque(5.0, 12.0)),
    // SAND
    11u8 => all_faces(FaceUv::opaque(2.0, 14.0)),
    // SANDSTONE
    12u8 => sided_faces(
        FaceUv::opaque(0.0, 3.0),
        FaceUv::opaque(0.0, 4.0),
        FaceUv::opaque(0.0, 4.0),
    ),
    // COBBLESTONE
    13u8 => all_faces(FaceUv::opaque(0.0, 14.0)),
};

impl BlockType {
    /// Atlas placement for each face, `None` for `EMPTY`.
    pub fn face_uvs(self) -> Option<&'static [FaceUv; 6]> {
        BLOCK_FACE_TABLE.get(&self.id())
    }

    /// Opaque blocks hide any face pressed against them.
    pub fn is_solid(self) -> bool {
        self.face_uvs()
            .is_some_and(|faces| faces[0].alpha == 1.0)
    }

    /// Translucent blocks are drawn in the second pass and hide each other's faces.
    pub fn is_transparent(self) -> bool {
        self.face_uvs()
            .is_some_and(|faces| faces[0].alpha > 0.0 && faces[0].alpha < 1.0)
    }

    /// Physical response for the player controller.
    pub fn physics(self) -> BlockPhysics {
        match self {
            BlockType::EMPTY => BlockPhysics::EMPTY,
            BlockType::WATER | BlockType::LAVA => BlockPhysics::LIQUID,
            _ => BlockPhysics::SOLID,
        }
    }
}

/// How a block interacts with a moving body.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BlockPhysics {
    /// Bodies cannot pass through the block.
    pub is_solid: bool,
    /// Bodies inside the block can move upward freely.
    pub can_climb: bool,
    /// Fraction of velocity removed per second while inside the block.
    pub drag: f32,
}

impl BlockPhysics {
    /// Open air.
    pub const EMPTY: BlockPhysics = BlockPhysics {
        is_solid: false,
        can_climb: false,
        drag: 0.0,
    };

    /// Water and lava.
    pub const LIQUID: BlockPhysics = BlockPhysics {
        is_solid: false,
        can_climb: true,
        drag: 0.15,
    };

    /// Everything else.
    pub const SOLID: BlockPhysics = BlockPhysics {
        is_solid: true,
        can_climb: false,
        drag: 0.0,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_non_empty_block_has_faces() {
        for block in BlockType::ALL {
            assert_eq!(block.face_uvs().is_some(), block != BlockType::EMPTY);
        }
    }

    #[test]
    fn solid_and_transparent_are_exclusive() {
        for block in BlockType::ALL {
            assert!(!(block.is_solid() && block.is_transparent()), "{block:?}");
        }
        let transparent: Vec<_> = BlockType::ALL
            .into_iter()
            .filter(|b| b.is_transparent())
            .collect();
        assert_eq!(
            transparent,
            vec![BlockType::WATER, BlockType::LAVA, BlockType::ICE]
        );
        assert!(!BlockType::EMPTY.is_solid());
        assert!(!BlockType::EMPTY.is_transparent());
    }

    #[test]
    fn grass_top_differs_from_sides() {
        let faces = BlockType::GRASS.face_uvs().unwrap();
        assert_eq!(faces[0], faces[1]);
        assert_ne!(faces[2], faces[0]);
        assert_ne!(faces[3], faces[2]);
    }

    #[test]
    fn liquids_are_climbable_and_not_solid() {
        assert_eq!(BlockType::WATER.physics(), BlockPhysics::LIQUID);
        assert_eq!(BlockType::LAVA.physics().drag, 0.15);
        assert!(BlockType::ICE.physics().is_solid);
        assert!(!BlockType::EMPTY.physics().is_solid);
    }
}
