//! # Structures Module
//!
//! Procedural structures stamped over generated terrain: trees, pyramids, ice
//! spikes and lookout towers. Each is placed at a jittered point of a coarse
//! grid ("voronoi points"), filtered by the biome under it, and described as a
//! list of block offsets relative to its root on the terrain surface.
//!
//! Placement is a pure function of world coordinates. A chunk searches a margin
//! around itself wide enough to catch every structure whose footprint can reach
//! into it, and the stamping step clips everything outside its own bounds, so
//! a structure straddling several chunks is reproduced piecewise and
//! seamlessly.

use cgmath::{Vector2, Vector3};

use super::biome::{Biome, ColumnSampleCache};
use super::block::block_type::BlockType;
use super::chunk::CHUNK_WIDTH;
use super::noise::{mix, random2};

/// The kinds of structure the generator knows.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StructureKind {
    /// Stepped sandstone pyramid, radius 15 to 35.
    Pyramid,
    /// Five-wide leaf canopy on a four-block trunk.
    Tree,
    /// Tapered ice column, half-height 4 to 25.
    IceSpike,
    /// Hollow cobblestone tower, 5 to 28 tall.
    Lookout,
}

/// How a structure kind is scattered over the world.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Placement {
    /// Which structure this rule places
    pub kind: StructureKind,
    /// Extra search distance around a chunk; the structure's maximum reach
    pub search_margin: i32,
    /// Side of a placement grid cell
    pub cell_size: f32,
    /// Probability that a grid cell holds a candidate
    pub frequency: f32,
    /// Biome the candidate's root column must have
    pub biome: Biome,
}

/// Placement rules, in stamping order.
pub const PLACEMENTS: [Placement; 4] = [
    Placement {
        kind: StructureKind::Pyramid,
        search_margin: 40,
        cell_size: 160.0,
        frequency: 0.4,
        biome: Biome::DESERT,
    },
    Placement {
        kind: StructureKind::Tree,
        search_margin: 4,
        cell_size: 10.0,
        frequency: 0.14,
        biome: Biome::GRASSLAND,
    },
    Placement {
        kind: StructureKind::IceSpike,
        search_margin: 2,
        cell_size: 13.0,
        frequency: 0.25,
        biome: Biome::MOUNTAINS,
    },
    Placement {
        kind: StructureKind::Lookout,
        search_margin: 4,
        cell_size: 16.0,
        frequency: 0.22,
        biome: Biome::ARCHIPELAGO,
    },
];

/// A placed structure: kind, root column and shape seed in `[0, 1)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Structure {
    /// What to build
    pub kind: StructureKind,
    /// World `(x, z)` of the root column
    pub position: Vector2<i32>,
    /// Shape parameter
    pub seed: f32,
}

/// A block of a structure, offset from the root.
pub type StructureBlock = (BlockType, Vector3<i32>);

impl Structure {
    /// Block offsets relative to the root `(x, surface height, z)`.
    ///
    /// Later entries overwrite earlier ones when stamped.
    pub fn blocks(&self) -> Vec<StructureBlock> {
        match self.kind {
            StructureKind::Pyramid => pyramid_blocks(self.seed),
            StructureKind::Tree => tree_blocks(),
            StructureKind::IceSpike => ice_spike_blocks(self.seed),
            StructureKind::Lookout => lookout_blocks(self.seed),
        }
    }
}

/// Interpolated integer size, truncated toward zero.
fn scaled_size(min: i32, max: i32, seed: f32) -> i32 {
    mix(min as f32, max as f32, seed) as i32
}

fn pyramid_blocks(seed: f32) -> Vec<StructureBlock> {
    let radius = scaled_size(15, 35, seed);
    let sink = radius / 5;
    let mut blocks = Vec::new();
    for y in 0..=radius {
        for x in (-radius + y)..(radius - y) {
            for z in (-radius + y)..(radius - y) {
                blocks.push((BlockType::SANDSTONE, Vector3::new(x, y - sink, z)));
            }
        }
    }
    blocks
}

fn tree_blocks() -> Vec<StructureBlock> {
    let mut blocks = Vec::new();
    for y in 3..=4 {
        for x in -2..=2 {
            for z in -2..=2 {
                blocks.push((BlockType::LEAF, Vector3::new(x, y, z)));
            }
        }
    }
    for y in 5..=6 {
        for x in -1_i32..=1 {
            for z in -1_i32..=1 {
                // rounds off the top corners
                if x.abs() + z.abs() + y == 8 {
                    continue;
                }
                blocks.push((BlockType::LEAF, Vector3::new(x, y, z)));
            }
        }
    }
    for y in 1..=4 {
        blocks.push((BlockType::WOOD, Vector3::new(0, y, 0)));
    }
    blocks
}

fn ice_spike_blocks(seed: f32) -> Vec<StructureBlock> {
    let height = scaled_size(4, 25, seed);
    let mut blocks = Vec::new();
    for y in -height..=height {
        blocks.push((BlockType::ICE, Vector3::new(0, y, 0)));
    }
    for y in (-height / 2)..=(height / 2) {
        for (x, z) in [(-1, -1), (1, -1), (1, 1), (-1, 1)] {
            blocks.push((BlockType::ICE, Vector3::new(x, y, z)));
        }
    }
    for y in (-height / 4 * 3)..=(height / 4 * 3) {
        for (x, z) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            blocks.push((BlockType::ICE, Vector3::new(x, y, z)));
        }
    }
    blocks
}

fn lookout_blocks(seed: f32) -> Vec<StructureBlock> {
    let height = scaled_size(5, 28, seed);
    let mut blocks = Vec::new();
    for y in -5..=height {
        for x in 0..=1 {
            blocks.push((BlockType::COBBLESTONE, Vector3::new(x, y, -1)));
            blocks.push((BlockType::COBBLESTONE, Vector3::new(x, y, 2)));
            blocks.push((BlockType::COBBLESTONE, Vector3::new(-1, y, x)));
            blocks.push((BlockType::COBBLESTONE, Vector3::new(2, y, x)));
        }
    }
    for x in 0..=1 {
        for z in 0..=1 {
            blocks.push((BlockType::COBBLESTONE, Vector3::new(x, height - 1, z)));
        }
    }
    blocks
}

/// Jittered grid points inside `[start_x, end_x) × [start_z, end_z)`.
///
/// Every grid cell of side `cell_size` overlapping the box gets a candidate with
/// probability `frequency`; the candidate's position inside its cell and its
/// seed are hashes of the cell coordinates, so a cell always yields the same
/// point no matter which box is searched.
pub fn voronoi_points(
    start_x: i32,
    start_z: i32,
    end_x: i32,
    end_z: i32,
    cell_size: f32,
    frequency: f32,
) -> Vec<(Vector2<i32>, f32)> {
    let first_x = (start_x as f32 / cell_size).floor() as i32;
    let first_z = (start_z as f32 / cell_size).floor() as i32;
    let last_x = (end_x as f32 / cell_size).floor() as i32;
    let last_z = (end_z as f32 / cell_size).floor() as i32;

    let mut points = Vec::new();
    for cell_x in first_x..=last_x {
        for cell_z in first_z..=last_z {
            let (cx, cz) = (cell_x as f32, cell_z as f32);
            if random2(Vector2::new(cx, cz)) > frequency {
                continue;
            }

            let x_frac = random2(Vector2::new(cx * 1235.231, cz * 631.613));
            let z_frac = random2(Vector2::new(cx * 838.513, cz * 351.345));
            let seed = random2(Vector2::new(cx * 823.156, cz * 235.456));

            let x = ((cx + x_frac) * cell_size).floor() as i32;
            let z = ((cz + z_frac) * cell_size).floor() as i32;

            if x >= start_x && x < end_x && z >= start_z && z < end_z {
                points.push((Vector2::new(x, z), seed));
            }
        }
    }
    points
}

/// Every structure that can reach into the chunk whose minimum corner is
/// `(chunk_x, chunk_z)`, in stamping order.
pub fn structures_near_chunk(
    chunk_x: i32,
    chunk_z: i32,
    columns: &mut ColumnSampleCache,
) -> Vec<Structure> {
    let mut structures = Vec::new();
    for placement in &PLACEMENTS {
        let margin = placement.search_margin;
        let candidates = voronoi_points(
            chunk_x - margin,
            chunk_z - margin,
            chunk_x + CHUNK_WIDTH + margin,
            chunk_z + CHUNK_WIDTH + margin,
            placement.cell_size,
            placement.frequency,
        );
        for (position, seed) in candidates {
            if columns.sample(position.x, position.y).biome != placement.biome {
                continue;
            }
            structures.push(Structure {
                kind: placement.kind,
                position,
                seed,
            });
        }
    }
    structures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_has_trunk_and_rounded_canopy() {
        let blocks = tree_blocks();
        let wood = blocks
            .iter()
            .filter(|(block, _)| *block == BlockType::WOOD)
            .count();
        assert_eq!(wood, 4);
        // 2 layers of 25, then 9 and 5 after trimming the corners of the top layer
        let leaves = blocks.len() - wood;
        assert_eq!(leaves, 50 + 9 + 5);
        assert!(!blocks.contains(&(BlockType::LEAF, Vector3::new(1, 6, 1))));
    }

    #[test]
    fn pyramid_size_follows_seed() {
        let small = Structure {
            kind: StructureKind::Pyramid,
            position: Vector2::new(0, 0),
            seed: 0.0,
        };
        let blocks = small.blocks();
        // radius 15 sinks 3 blocks; the base layer is 30 × 30
        let base = blocks.iter().filter(|(_, p)| p.y == -3).count();
        assert_eq!(base, 30 * 30);
        assert!(blocks.iter().all(|(b, _)| *b == BlockType::SANDSTONE));
    }

    #[test]
    fn ice_spike_layers_taper() {
        let blocks = ice_spike_blocks(0.5);
        // height = 14: center 29, corners 4 * 15, sides 4 * 19
        assert_eq!(blocks.len(), 29 + 4 * 15 + 4 * 19);
    }

    #[test]
    fn voronoi_points_respect_bounds_and_are_stable() {
        let points = voronoi_points(-200, -200, 200, 200, 10.0, 0.14);
        assert!(!points.is_empty());
        for (p, seed) in &points {
            assert!((-200..200).contains(&p.x) && (-200..200).contains(&p.y));
            assert!((0.0..1.0).contains(seed));
        }

        // a sub-box sees exactly the points of the big box inside it
        let sub = voronoi_points(0, 0, 50, 50, 10.0, 0.14);
        let expected: Vec<_> = points
            .iter()
            .filter(|(p, _)| (0..50).contains(&p.x) && (0..50).contains(&p.y))
            .copied()
            .collect();
        assert_eq!(sub.len(), expected.len());
        for point in sub {
            assert!(expected.contains(&point));
        }
    }

    #[test]
    fn placements_respect_biomes() {
        let mut columns = ColumnSampleCache::default();
        for chunk_x in (-160..160).step_by(16) {
            for structure in structures_near_chunk(chunk_x, 32, &mut columns) {
                let rule = PLACEMENTS
                    .iter()
                    .find(|p| p.kind == structure.kind)
                    .unwrap();
                let sample = columns.sample(structure.position.x, structure.position.y);
                assert_eq!(sample.biome, rule.biome);
            }
        }
    }
}
