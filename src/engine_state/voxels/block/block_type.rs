//! # Block Type Module
//!
//! The closed set of block types a terrain cell can hold, and their compact
//! integer id.

use super::BlockTypeSize;

/// Every kind of block the terrain stores.
///
/// The discriminant is the block's id in the static face table
/// ([`BLOCK_FACE_TABLE`](super::BLOCK_FACE_TABLE)) and in any serialized form.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlockType {
    /// Nothing. Never drawn and never culls a neighbor's face.
    #[default]
    EMPTY = 0,
    /// Grass-topped dirt.
    GRASS = 1,
    /// Dirt.
    DIRT = 2,
    /// Stone, also the stand-in for unloaded neighbor chunks during meshing.
    STONE = 3,
    /// Translucent, animated water.
    WATER = 4,
    /// Snow cap on high mountains.
    SNOW = 5,
    /// Translucent, animated lava.
    LAVA = 6,
    /// Indestructible floor at y = 0.
    BEDROCK = 7,
    /// Translucent ice, used by ice spikes.
    ICE = 8,
    /// Tree trunk.
    WOOD = 9,
    /// Tree canopy.
    LEAF = 10,
    /// Desert surface.
    SAND = 11,
    /// Pyramid masonry.
    SANDSTONE = 12,
    /// Lookout tower masonry.
    COBBLESTONE = 13,
}

impl BlockType {
    /// All block types in id order.
    pub const ALL: [BlockType; 14] = [
        BlockType::EMPTY,
        BlockType::GRASS,
        BlockType::DIRT,
        BlockType::STONE,
        BlockType::WATER,
        BlockType::SNOW,
        BlockType::LAVA,
        BlockType::BEDROCK,
        BlockType::ICE,
        BlockType::WOOD,
        BlockType::LEAF,
        BlockType::SAND,
        BlockType::SANDSTONE,
        BlockType::COBBLESTONE,
    ];

    /// The compact id of this block type.
    pub const fn id(self) -> BlockTypeSize {
        self as BlockTypeSize
    }
}
