//! Packing of world `(x, z)` corners into 64-bit map keys, and the zone grid.
//!
//! A key stores `x` in the upper 32 bits and `z` in the lower 32 bits. Decoding
//! sign-extends the low half, so negative coordinates round-trip.

use std::collections::HashSet;

use cgmath::Vector2;

use crate::engine_state::voxels::chunk::CHUNK_WIDTH;

/// Key of a chunk: its packed minimum corner.
pub type ChunkKey = i64;
/// Key of a zone: its packed minimum corner.
pub type ZoneKey = i64;

/// Side length of a zone in blocks; a zone is 4 × 4 chunks.
pub const ZONE_WIDTH: i32 = 64;

/// Packs `(x, z)` into one key.
#[inline]
pub const fn to_key(x: i32, z: i32) -> i64 {
    ((x as i64) << 32) | (z as i64 & 0xffff_ffff)
}

/// Unpacks a key made by [`to_key`].
#[inline]
pub const fn to_coords(key: i64) -> Vector2<i32> {
    Vector2::new((key >> 32) as i32, key as i32)
}

/// Minimum corner of the chunk containing world column `(x, z)`.
#[inline]
pub fn chunk_origin(x: i32, z: i32) -> Vector2<i32> {
    Vector2::new(
        x.div_euclid(CHUNK_WIDTH) * CHUNK_WIDTH,
        z.div_euclid(CHUNK_WIDTH) * CHUNK_WIDTH,
    )
}

/// Minimum corner of the zone containing world column `(x, z)`.
#[inline]
pub fn zone_origin(x: i32, z: i32) -> Vector2<i32> {
    Vector2::new(
        x.div_euclid(ZONE_WIDTH) * ZONE_WIDTH,
        z.div_euclid(ZONE_WIDTH) * ZONE_WIDTH,
    )
}

/// Zone origin under a floating-point world position.
pub fn zone_at(x: f32, z: f32) -> Vector2<i32> {
    zone_origin(x.floor() as i32, z.floor() as i32)
}

/// Origins of the 16 chunks of a zone, x-major.
pub fn chunks_in_zone(zone: Vector2<i32>) -> impl Iterator<Item = Vector2<i32>> {
    (0..ZONE_WIDTH).step_by(CHUNK_WIDTH as usize).flat_map(move |dx| {
        (0..ZONE_WIDTH)
            .step_by(CHUNK_WIDTH as usize)
            .map(move |dz| Vector2::new(zone.x + dx, zone.y + dz))
    })
}

/// Keys of every zone within Chebyshev distance `radius` (in zones) of `zone`,
/// including `zone` itself.
pub fn bordering_zones(zone: Vector2<i32>, radius: i32) -> HashSet<ZoneKey> {
    let mut zones = HashSet::new();
    for i in -radius..=radius {
        for j in -radius..=radius {
            zones.insert(to_key(zone.x + i * ZONE_WIDTH, zone.y + j * ZONE_WIDTH));
        }
    }
    zones
}

/// `"( x, z )"`, the form coordinates are shown in to users.
pub fn coords_string(origin: Vector2<i32>) -> String {
    format!("( {}, {} )", origin.x, origin.y)
}
