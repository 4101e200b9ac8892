//! # Chunk Generation
//!
//! Fills a chunk's blocks from world coordinates alone, so any chunk can be
//! generated independently, on any thread, in any order, with identical results.
//!
//! ## Pipeline
//!
//! 1. Clear every block to `EMPTY`.
//! 2. For each of the 16 × 16 columns:
//!    water band `[114, 138)`, stone up to the surface, biome surface dressing,
//!    cave carving below y = 128, bedrock at y = 0.
//! 3. Stamp every structure that can reach into the chunk, clipped to the
//!    chunk's bounds.

use cgmath::{InnerSpace, Vector2, Vector3};
use ::noise::{NoiseFn, ScaleBias, TranslatePoint};

use super::{Chunk, CHUNK_HEIGHT, CHUNK_WIDTH};
use crate::engine_state::voxels::biome::{Biome, ColumnClimate, ColumnSampleCache, SEA_FLOOR, SEA_LEVEL};
use crate::engine_state::voxels::block::block_type::BlockType;
use crate::engine_state::voxels::noise::{fbm, mix, perlin2, smoothstep, GradientNoise3};
use crate::engine_state::voxels::structures::{structures_near_chunk, Structure};

/// Caves are only carved below this height.
pub const CAVE_CEILING: i32 = 128;
/// Carved cells below this height fill with lava instead of air.
pub const LAVA_LEVEL: i32 = 24;

/// The two 3D fields caves are carved from.
struct CaveFields {
    /// Signed tunnel field in `[-1, 1]`
    spaghetti: GradientNoise3,
    /// Cavern field, offset from the tunnels and remapped to `[0, 1]`
    cheese: ScaleBias<f64, TranslatePoint<GradientNoise3>, 3>,
}

impl CaveFields {
    fn new() -> Self {
        let cheese = TranslatePoint::new(GradientNoise3 { dim: 0.019 }).set_translation(2309.363);
        Self {
            spaghetti: GradientNoise3 { dim: 0.03 },
            cheese: ScaleBias::new(cheese).set_scale(0.5).set_bias(0.5),
        }
    }
}

impl Chunk {
    /// Generates terrain and structures for this chunk.
    pub fn generate_terrain(&mut self) {
        self.generate_terrain_cached(&mut ColumnSampleCache::default());
    }

    /// Generates terrain and structures, sharing structure-placement column
    /// samples with other chunks through `columns`.
    pub fn generate_terrain_cached(&mut self, columns: &mut ColumnSampleCache) {
        self.generate_columns_with(|chunk, cx, cz| chunk.generate_terrain_column(cx, cz));
        let structures = structures_near_chunk(self.origin.x, self.origin.y, columns);
        self.stamp_structures(&structures, columns);
    }

    /// Clears the chunk and fills every column with `generate_column`, then
    /// marks the chunk generated.
    ///
    /// `generate_column` receives local column coordinates and is free to write
    /// anywhere in that column through [`Chunk::set_block_at`].
    pub fn generate_columns_with<F>(&mut self, mut generate_column: F)
    where
        F: FnMut(&mut Chunk, i32, i32),
    {
        self.blocks.fill(BlockType::EMPTY);
        for cx in 0..CHUNK_WIDTH {
            for cz in 0..CHUNK_WIDTH {
                generate_column(self, cx, cz);
            }
        }
        self.generated = true;
        self.revision += 1;
    }

    /// Fills the column at local `(cx, cz)` with natural terrain.
    pub fn generate_terrain_column(&mut self, cx: i32, cz: i32) {
        let x = self.origin.x + cx;
        let z = self.origin.y + cz;

        for y in SEA_FLOOR..SEA_LEVEL {
            self.put(cx, y, cz, BlockType::WATER);
        }

        let climate = ColumnClimate::at(x, z);
        let surface = climate.terrain_height(x, z).min(CHUNK_HEIGHT - 1);

        for y in 0..=surface {
            self.put(cx, y, cz, BlockType::STONE);
        }

        self.dress_surface(cx, cz, surface, climate.biome());
        self.carve_caves(cx, cz);

        self.put(cx, 0, cz, BlockType::BEDROCK);
    }

    /// Writes the biome's surface blocks on top of the stone column.
    fn dress_surface(&mut self, cx: i32, cz: i32, surface: i32, biome: Biome) {
        let x = self.origin.x + cx;
        let z = self.origin.y + cz;
        match biome {
            Biome::ARCHIPELAGO => {
                if surface >= SEA_LEVEL {
                    self.put(cx, surface, cz, BlockType::LEAF);
                }
            }
            Biome::GRASSLAND => {
                for y in (surface - 3)..surface {
                    self.put(cx, y, cz, BlockType::DIRT);
                }
                self.put(cx, surface, cz, BlockType::GRASS);
            }
            Biome::DESERT => {
                for y in (surface - 3)..=surface {
                    self.put(cx, y, cz, BlockType::SAND);
                }
            }
            Biome::MOUNTAINS => {
                for y in (surface - 3)..=surface {
                    self.put(cx, y, cz, BlockType::STONE);
                }
                let snow_line = mix(180.0, 220.0, fbm(x as f32 * 0.02, z as f32 * 0.02));
                if surface as f32 > snow_line && surface + 1 < CHUNK_HEIGHT {
                    self.put(cx, surface + 1, cz, BlockType::SNOW);
                }
            }
            Biome::OCEAN => {}
        }
    }

    /// Carves spaghetti tunnels and cheese caverns below [`CAVE_CEILING`].
    ///
    /// Two signed distance fields are merged with a rounded union; cells whose
    /// merged distance falls under a threshold that rises near the ceiling and
    /// the floor become air, or lava below [`LAVA_LEVEL`].
    fn carve_caves(&mut self, cx: i32, cz: i32) {
        let x = (self.origin.x + cx) as f32;
        let z = (self.origin.y + cz) as f32;
        let column = Vector2::new(x, z) * 0.01;

        let spaghetti_mask = perlin2(column, 1.0) * 0.5 + 0.5;
        let cheese_mask = perlin2(column + Vector2::new(1023.0, 1023.0), 1.0) * 0.5 + 0.5;
        let spaghetti_fill = mix(0.085, 0.13, spaghetti_mask);
        let cheese_fill = mix(0.075, 0.12, cheese_mask);

        const MERGE_RADIUS: f32 = 0.045;

        let fields = CaveFields::new();
        for y in 0..CAVE_CEILING {
            let yf = y as f32;
            let mapped_height = (yf + 3.0) / (CAVE_CEILING as f32 - 3.0);
            let height_clip =
                smoothstep(0.75, 1.0, mapped_height) + smoothstep(0.75, 1.0, 1.0 - yf);

            let cell = [x as f64, yf as f64, z as f64];

            let spaghetti = fields.spaghetti.get(cell) as f32;
            let spaghetti_sdf = mix(-spaghetti_fill, 1.0 - spaghetti_fill, spaghetti.abs());

            let cheese = fields.cheese.get(cell) as f32;
            let cheese_sdf = mix(-cheese_fill, 1.0 - cheese_fill, cheese);

            let merged = Vector2::new(spaghetti_sdf.min(0.0), cheese_sdf.min(0.0));
            let carve = merged.magnitude() - MERGE_RADIUS;

            if carve < -height_clip {
                let fill = if y < LAVA_LEVEL {
                    BlockType::LAVA
                } else {
                    BlockType::EMPTY
                };
                self.put(cx, y, cz, fill);
            }
        }
    }

    /// Writes each structure's blocks, rooted on the surface of its column and
    /// clipped to this chunk.
    pub fn stamp_structures(&mut self, structures: &[Structure], columns: &mut ColumnSampleCache) {
        let min_x = self.origin.x;
        let min_z = self.origin.y;
        for structure in structures {
            let root = Vector3::new(
                structure.position.x,
                columns.sample(structure.position.x, structure.position.y).height,
                structure.position.y,
            );
            for (block, offset) in structure.blocks() {
                let world = root + offset;
                let (lx, ly, lz) = (world.x - min_x, world.y, world.z - min_z);
                if !Chunk::contains_local(lx, ly, lz) {
                    continue;
                }
                self.put(lx, ly, lz, block);
            }
        }
        if !structures.is_empty() {
            self.revision += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::biome::terrain_height;
    use crate::engine_state::voxels::chunk::CHUNK_VOLUME;
    use crate::engine_state::voxels::structures::StructureKind;

    #[test]
    fn columns_have_bedrock_and_a_stone_core() {
        let mut chunk = Chunk::new(32, -16);
        chunk.generate_terrain();
        assert!(chunk.is_generated());
        for cx in [0, 7, 15] {
            for cz in [0, 9, 15] {
                assert_eq!(chunk.block_at(cx, 0, cz), BlockType::BEDROCK);
                let surface = terrain_height(32 + cx, -16 + cz);
                // nothing natural above the surface except water, snow, or structures
                for y in (surface + 2)..CHUNK_HEIGHT {
                    let block = chunk.block_at(cx, y, cz);
                    assert!(
                        matches!(
                            block,
                            BlockType::EMPTY
                                | BlockType::WATER
                                | BlockType::LEAF
                                | BlockType::WOOD
                                | BlockType::SANDSTONE
                                | BlockType::ICE
                                | BlockType::COBBLESTONE
                        ),
                        "{block:?} at ({cx}, {y}, {cz})"
                    );
                }
            }
        }
    }

    #[test]
    fn water_band_sits_above_low_surfaces() {
        for (x, z) in [(0, 0), (-1600, 320), (2400, -2400), (5120, 4096), (-4000, -4000)] {
            let mut chunk = Chunk::new(x, z);
            chunk.generate_columns_with(|chunk, cx, cz| chunk.generate_terrain_column(cx, cz));
            for cx in 0..CHUNK_WIDTH {
                for cz in 0..CHUNK_WIDTH {
                    let surface = terrain_height(x + cx, z + cz);
                    // caves may drain the band below the cave ceiling
                    for y in (surface + 1).max(CAVE_CEILING)..SEA_LEVEL {
                        assert_eq!(chunk.block_at(cx, y, cz), BlockType::WATER);
                    }
                    if surface >= SEA_LEVEL {
                        for y in (surface + 1)..CHUNK_HEIGHT {
                            assert_ne!(chunk.block_at(cx, y, cz), BlockType::WATER);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn caves_open_below_the_ceiling() {
        let mut carved = 0;
        for (x, z) in [(0, 0), (160, -96), (-320, 480), (1024, 2048)] {
            let mut chunk = Chunk::new(x, z);
            chunk.generate_columns_with(|chunk, cx, cz| chunk.generate_terrain_column(cx, cz));
            for cx in 0..CHUNK_WIDTH {
                for cz in 0..CHUNK_WIDTH {
                    // only caves leave gaps below the surface dressing
                    let solid_to = SEA_FLOOR - 3;
                    carved += (1..solid_to)
                        .filter(|y| {
                            matches!(chunk.block_at(cx, *y, cz), BlockType::EMPTY | BlockType::LAVA)
                        })
                        .count();
                }
            }
        }
        assert!(carved > 0);
    }

    #[test]
    fn generation_is_deterministic() {
        let mut a = Chunk::new(-48, 64);
        let mut b = Chunk::new(-48, 64);
        a.generate_terrain();
        b.generate_terrain_cached(&mut ColumnSampleCache::new(8));
        for index in (0..CHUNK_VOLUME).step_by(97) {
            let p = Chunk::local_coords(index);
            assert_eq!(a.block_at(p.x, p.y, p.z), b.block_at(p.x, p.y, p.z));
        }
    }

    #[test]
    fn structures_are_clipped_to_the_chunk() {
        let mut chunk = Chunk::new(0, 0);
        chunk.generate_columns_with(|_, _, _| {});
        let mut columns = ColumnSampleCache::default();
        let root_height = columns.sample(15, 15).height;
        let tree = Structure {
            kind: StructureKind::Tree,
            position: Vector2::new(15, 15),
            seed: 0.0,
        };
        chunk.stamp_structures(&[tree], &mut columns);

        assert_eq!(chunk.block_at(15, root_height + 1, 15), BlockType::WOOD);
        // canopy layers are 5 × 5 but only the 3 × 3 corner inside the chunk lands
        let leaves_at_3 = (0..CHUNK_WIDTH)
            .flat_map(|x| (0..CHUNK_WIDTH).map(move |z| (x, z)))
            .filter(|(x, z)| chunk.block_at(*x, root_height + 3, *z) == BlockType::LEAF)
            .count();
        assert_eq!(leaves_at_3, 9);
    }

    #[test]
    fn structure_across_a_border_is_split_between_both_chunks() {
        let mut columns = ColumnSampleCache::default();
        let root_of = |structure: &Structure, columns: &mut ColumnSampleCache| {
            let p = structure.position;
            Vector3::new(p.x, columns.sample(p.x, p.y).height, p.y)
        };
        let inside = |world: Vector3<i32>, x: i32, z: i32| {
            Chunk::contains_local(world.x - x, world.y, world.z - z)
        };

        let mut found = None;
        'search: for i in -64..64 {
            for j in -8..8 {
                let (x, z) = (i * CHUNK_WIDTH, j * CHUNK_WIDTH);
                let west = structures_near_chunk(x, z, &mut columns);
                let east = structures_near_chunk(x + CHUNK_WIDTH, z, &mut columns);
                for structure in west.into_iter().filter(|s| east.contains(s)) {
                    let root = root_of(&structure, &mut columns);
                    let blocks = structure.blocks();
                    let in_west = blocks.iter().any(|(_, o)| inside(root + *o, x, z));
                    let in_east = blocks.iter().any(|(_, o)| inside(root + *o, x + CHUNK_WIDTH, z));
                    if in_west && in_east {
                        found = Some((x, z, structure));
                        break 'search;
                    }
                }
            }
        }
        let (x, z, structure) = found.expect("no structure straddles a chunk border");

        let mut west = Chunk::new(x, z);
        let mut east = Chunk::new(x + CHUNK_WIDTH, z);
        west.generate_columns_with(|_, _, _| {});
        east.generate_columns_with(|_, _, _| {});
        west.stamp_structures(&[structure], &mut columns);
        east.stamp_structures(&[structure], &mut columns);

        let root = root_of(&structure, &mut columns);
        let mut expected = std::collections::HashMap::new();
        for (block, offset) in structure.blocks() {
            let world = root + offset;
            expected.insert((world.x, world.y, world.z), block);
        }

        let mut landed = 0;
        for (&(wx, wy, wz), &block) in &expected {
            let world = Vector3::new(wx, wy, wz);
            for chunk in [&west, &east] {
                let origin = chunk.origin();
                if inside(world, origin.x, origin.y) {
                    assert_eq!(chunk.block_at(wx - origin.x, wy, wz - origin.y), block);
                    if block != BlockType::EMPTY {
                        landed += 1;
                    }
                }
            }
        }
        // nothing outside the footprint was written
        let written: usize = [&west, &east]
            .iter()
            .map(|chunk| {
                BlockType::ALL
                    .iter()
                    .filter(|block| **block != BlockType::EMPTY)
                    .map(|block| chunk.count_blocks(*block))
                    .sum::<usize>()
            })
            .sum();
        assert_eq!(written, landed);
        assert!(landed > 0);
    }
}
