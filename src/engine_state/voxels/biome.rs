//! # Biome Module
//!
//! Column-level climate: the blend weights that pick a biome, the biome itself,
//! and the surface height, all as pure functions of world `(x, z)`.
//!
//! ## Blending
//!
//! Three low-frequency fields drive everything. `height_blend` and `humidity`
//! choose between four land shapes (grassland, archipelago, desert, mountains)
//! and `ocean` pulls the result down to sea level. Heights are blended
//! continuously so biome borders never produce cliffs; the discrete biome is
//! only used to choose surface blocks and structures.

use std::num::NonZeroUsize;

use cgmath::Vector2;
use lru::LruCache;

use ::noise::{NoiseFn, ScalePoint};

use super::noise::{fbm, mix, perlin2, smoothstep, FractalValueNoise, WorleyCells};

/// Lowest surface height, and the bottom of the water band.
pub const SEA_FLOOR: i32 = 114;
/// Top of the water band (exclusive).
pub const SEA_LEVEL: i32 = 138;

/// Cellular field shaping the grassland hills.
const GRASSLAND_CELLS: WorleyCells = WorleyCells { cells: 0.01 };

/// Discrete surface classification of a column.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Biome {
    /// Rolling hills with dirt and grass, dotted with trees.
    GRASSLAND,
    /// Sharp islands with leaf caps and lookout towers.
    ARCHIPELAGO,
    /// High stone peaks with snow caps and ice spikes.
    MOUNTAINS,
    /// Sand dunes and pyramids.
    DESERT,
    /// Flattened toward the sea floor, no surface dressing.
    OCEAN,
}

/// The three blend weights of a column, each in `[0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColumnClimate {
    /// Low → flat biomes (grassland/desert), high → tall biomes (archipelago/mountains)
    pub height_blend: f32,
    /// Low → dry biomes (desert/mountains), high → humid biomes (grassland/archipelago)
    pub humidity: f32,
    /// Weight of the pull toward the sea floor
    pub ocean: f32,
}

impl ColumnClimate {
    /// Samples the climate fields at a world column.
    pub fn at(x: i32, z: i32) -> Self {
        let (xf, zf) = (x as f32, z as f32);
        Self {
            height_blend: smoothstep(
                0.4,
                0.6,
                fbm(xf * 0.004 + 63.841, zf * 0.004 + 83.4517),
            ),
            humidity: smoothstep(0.4, 0.6, fbm(xf * 0.004, zf * 0.004)),
            ocean: smoothstep(0.45, 0.65, fbm(xf * 0.001, zf * 0.001)),
        }
    }

    /// Classifies the column.
    ///
    /// Any ocean weight above 0.1 wins; otherwise the quadrant of
    /// `(height_blend, humidity)` around 0.5 decides, with mountains taking
    /// every case the other three do not.
    pub fn biome(&self) -> Biome {
        if self.ocean > 0.1 {
            return Biome::OCEAN;
        }
        if self.height_blend > 0.5 && self.humidity > 0.5 {
            return Biome::ARCHIPELAGO;
        }
        if self.height_blend < 0.5 && self.humidity > 0.5 {
            return Biome::GRASSLAND;
        }
        if self.height_blend < 0.5 && self.humidity < 0.5 {
            return Biome::DESERT;
        }
        Biome::MOUNTAINS
    }

    /// Surface height of column `(x, z)` under this climate.
    pub fn terrain_height(&self, x: i32, z: i32) -> i32 {
        let (xf, zf) = (x as f32, z as f32);
        let column = Vector2::new(xf, zf);

        let point = [x as f64, z as f64];

        let hills = ScalePoint::new(FractalValueNoise).set_scale(0.05);
        let grassland_y = mix(
            138.0,
            166.0,
            GRASSLAND_CELLS.get(point).abs() as f32 + hills.get(point) as f32 * 0.06,
        );

        let peaks = ScalePoint::new(FractalValueNoise).set_scale(0.005);
        let mountain = |offset: i32| {
            let n = peaks.get([(x + offset) as f64, (z + offset) as f64]) as f32;
            mix(0.65, 0.9, n * n)
        };
        let mountain_y = mountain(0).max(mountain(9000)) * 255.0;

        let archipelago_big = mix(
            114.0,
            185.0,
            smoothstep(0.2, 1.0, perlin2(column, 0.02) * 0.5 + 0.5),
        );
        let archipelago_small = mix(0.0, 13.0, perlin2(column, 0.1) * 0.5 + 0.5);
        let archipelago_y = archipelago_big + archipelago_small;

        let desert_y = mix(139.0, 165.0, fbm(xf * 0.003 + 1593.2, zf * 0.003 + 234.3));

        let humid = mix(grassland_y, archipelago_y, self.height_blend);
        let dry = mix(desert_y, mountain_y, self.height_blend);
        let land = mix(dry, humid, self.humidity);

        mix(land, SEA_FLOOR as f32, self.ocean).floor() as i32
    }
}

/// Biome of world column `(x, z)`.
pub fn biome_at(x: i32, z: i32) -> Biome {
    ColumnClimate::at(x, z).biome()
}

/// Surface height of world column `(x, z)`.
pub fn terrain_height(x: i32, z: i32) -> i32 {
    ColumnClimate::at(x, z).terrain_height(x, z)
}

/// Biome and surface height of one column.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColumnSample {
    /// Surface classification
    pub biome: Biome,
    /// Surface height
    pub height: i32,
}

/// Memoizes [`ColumnSample`]s for structure placement.
///
/// Structure candidates near chunk borders are evaluated once per chunk they
/// might touch; a generation task that fills a whole zone shares one cache
/// across its chunks so each candidate column is sampled once.
pub struct ColumnSampleCache {
    samples: LruCache<(i32, i32), ColumnSample>,
}

impl ColumnSampleCache {
    /// Default capacity, enough for every structure candidate of one zone.
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Creates a cache holding at most `capacity` columns (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            samples: LruCache::new(capacity),
        }
    }

    /// Returns the sample for column `(x, z)`, computing it on a miss.
    pub fn sample(&mut self, x: i32, z: i32) -> ColumnSample {
        if let Some(sample) = self.samples.get(&(x, z)) {
            return *sample;
        }
        let climate = ColumnClimate::at(x, z);
        let sample = ColumnSample {
            biome: climate.biome(),
            height: climate.terrain_height(x, z),
        };
        self.samples.put((x, z), sample);
        sample
    }

    /// Number of cached columns.
    pub(crate) fn len(&self) -> usize {
        self.samples.len()
    }
}

impl Default for ColumnSampleCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
