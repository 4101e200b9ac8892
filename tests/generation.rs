use voxel_terrain::engine_state::voxels::biome::{biome_at, terrain_height, SEA_FLOOR, SEA_LEVEL};
use voxel_terrain::engine_state::voxels::block::block_type::BlockType;
use voxel_terrain::engine_state::voxels::chunk::generation::CAVE_CEILING;
use voxel_terrain::engine_state::voxels::chunk::{Chunk, CHUNK_HEIGHT, CHUNK_WIDTH};
use voxel_terrain::engine_state::voxels::terrain::keys::chunk_origin;

#[test]
fn height_and_biome_are_pure_functions_of_position() {
    let mut rng = fastrand::Rng::with_seed(7);
    for _ in 0..500 {
        let x = rng.i32(-100_000..100_000);
        let z = rng.i32(-100_000..100_000);
        assert_eq!(terrain_height(x, z), terrain_height(x, z));
        assert_eq!(biome_at(x, z), biome_at(x, z));
        assert!((0..CHUNK_HEIGHT).contains(&terrain_height(x, z)));
    }
}

#[test]
fn chunks_generate_identically_wherever_they_are_built() {
    let mut rng = fastrand::Rng::with_seed(11);
    for _ in 0..3 {
        let origin = chunk_origin(rng.i32(-5_000..5_000), rng.i32(-5_000..5_000));
        let mut first = Chunk::new(origin.x, origin.y);
        let mut second = Chunk::new(origin.x, origin.y);
        first.generate_terrain();
        second.generate_terrain();

        for _ in 0..2_000 {
            let x = rng.i32(0..CHUNK_WIDTH);
            let y = rng.i32(0..CHUNK_HEIGHT);
            let z = rng.i32(0..CHUNK_WIDTH);
            assert_eq!(first.block_at(x, y, z), second.block_at(x, y, z));
        }
        for block in BlockType::ALL {
            assert_eq!(first.count_blocks(block), second.count_blocks(block));
        }
    }
}

#[test]
fn sea_band_holds_only_water_or_terrain() {
    let mut chunk = Chunk::new(256, -512);
    chunk.generate_terrain();
    for cx in 0..CHUNK_WIDTH {
        for cz in 0..CHUNK_WIDTH {
            let surface = terrain_height(256 + cx, -512 + cz);
            for y in (surface + 2).max(SEA_FLOOR).max(CAVE_CEILING)..SEA_LEVEL {
                let block = chunk.block_at(cx, y, cz);
                // above the dressed surface and the caves the band is water,
                // unless a structure or snow cap reached into it
                assert!(
                    matches!(
                        block,
                        BlockType::WATER
                            | BlockType::SNOW
                            | BlockType::WOOD
                            | BlockType::LEAF
                            | BlockType::ICE
                            | BlockType::SANDSTONE
                            | BlockType::COBBLESTONE
                    ),
                    "unexpected {block:?} at ({cx}, {y}, {cz})"
                );
            }
        }
    }
}
