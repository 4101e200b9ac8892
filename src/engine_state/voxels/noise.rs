//! # Noise Module
//!
//! Stateless, deterministic noise primitives that drive terrain shaping. Every
//! function is a pure function of its inputs; there is no seed or global state,
//! so the same world coordinate always yields the same terrain.
//!
//! ## Primitives
//!
//! * Hashes: `random2`, `random2_layered`, `random3`, `lattice_hash`, each
//!   `fract(sin(dot(p, k)) * m)` with fixed constants, in `[0, 1)`
//! * `value_noise`: bilinear interpolation of `lattice_hash` at integer corners
//! * `worley` / `worley_edge`: cellular distance noise over a 3×3 cell neighborhood
//! * `perlin2`: cosine-smoothed lattice noise in `[-1, 1]`
//! * `perlin3`: gradient noise with hashed corner gradients, trilinear blend
//! * `fbm`: 8 octaves of `value_noise`, remapped through a smoothstep
//!
//! The primitives are also exposed as [`NoiseFn`] implementors so they compose
//! with the `noise` crate's modifiers and transformers. Terrain height and cave
//! carving sample them that way.
//!
//! ## Precision
//!
//! All arithmetic is `f32`. The hashes take `sin` of large arguments, so results
//! are reproducible on a given platform but not bit-identical across libm
//! implementations.

use cgmath::{InnerSpace, Vector2, Vector3};
use ::noise::NoiseFn;

/// Fractional part, `x - floor(x)`, always in `[0, 1)`.
///
/// Tiny negative inputs would round up to exactly `1.0`, so the result is
/// capped just below it.
#[inline]
pub fn fract(x: f32) -> f32 {
    (x - x.floor()).min(1.0 - f32::EPSILON)
}

/// Linear blend from `a` to `b`, exact at both endpoints.
#[inline]
pub fn mix(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Hermite step between two edges, clamped to `[0, 1]`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// 2D hash in `[0, 1)`.
#[inline]
pub fn random2(co: Vector2<f32>) -> f32 {
    fract((co.dot(Vector2::new(12.9898, 78.233))).sin() * 43758.5453)
}

/// 2D hash re-hashed together with a layer value.
#[inline]
pub fn random2_layered(co: Vector2<f32>, layer: f32) -> f32 {
    random2(Vector2::new(random2(co), layer))
}

/// 3D hash in `[0, 1)`.
#[inline]
pub fn random3(co: Vector3<f32>) -> f32 {
    fract(co.dot(Vector3::new(35.123125, 53.134536, 94.213515)).sin() * 340913.2435)
}

/// Lattice hash used by value noise and Worley feature points.
#[inline]
pub fn lattice_hash(co: Vector2<f32>) -> f32 {
    fract(co.dot(Vector2::new(23.12456, 69.233)).sin() * 69210.4235)
}

/// Bilinearly interpolated lattice noise.
pub fn value_noise(x: f32, y: f32) -> f32 {
    let ix = x.floor();
    let iy = y.floor();
    let fx = fract(x);
    let fy = fract(y);

    let v1 = lattice_hash(Vector2::new(ix, iy));
    let v2 = lattice_hash(Vector2::new(ix + 1.0, iy));
    let v3 = lattice_hash(Vector2::new(ix, iy + 1.0));
    let v4 = lattice_hash(Vector2::new(ix + 1.0, iy + 1.0));

    mix(mix(v1, v2, fx), mix(v3, v4, fx), fy)
}

/// Distances from `uv` to the feature points of the surrounding 3×3 cells.
fn cell_distances(uv: Vector2<f32>) -> impl Iterator<Item = f32> {
    let cell = Vector2::new(uv.x.floor(), uv.y.floor());
    let local = uv - cell;
    (-1..=1).flat_map(move |y| {
        (-1..=1).map(move |x| {
            let neighbor = Vector2::new(x as f32, y as f32);
            let point = lattice_hash(cell + neighbor);
            (neighbor + Vector2::new(point, point) - local).magnitude()
        })
    })
}

/// Cellular noise: `1 - d_min - 0.02`, where `d_min` is the distance to the
/// nearest feature point after scaling `uv` by `cells`.
pub fn worley(uv: Vector2<f32>, cells: f32) -> f32 {
    let min_dist = cell_distances(uv * cells).fold(3.0_f32, f32::min);
    1.0 - min_dist - 0.02
}

/// Gap between the nearest and second-nearest feature points at a fixed scale
/// of 6 cells per unit, with both running minima capped at 1.
pub fn worley_edge(uv: Vector2<f32>) -> f32 {
    let mut min_dist = 1.0_f32;
    let mut second_min_dist = 1.0_f32;
    for dist in cell_distances(uv * 6.0) {
        if dist < min_dist {
            second_min_dist = min_dist;
            min_dist = dist;
        } else if dist < second_min_dist {
            second_min_dist = dist;
        }
    }
    second_min_dist - min_dist
}

/// Cosine-smoothed lattice noise in `[-1, 1]`.
///
/// `dim` is the lattice frequency; corner values are hashed together with it so
/// different frequencies decorrelate.
pub fn perlin2(p: Vector2<f32>, dim: f32) -> f32 {
    let scaled = p * dim;
    let pos = Vector2::new(scaled.x.floor(), scaled.y.floor());

    let c = random2_layered(pos, dim);
    let cx = random2_layered(pos + Vector2::new(1.0, 0.0), dim);
    let cy = random2_layered(pos + Vector2::new(0.0, 1.0), dim);
    let cxy = random2_layered(pos + Vector2::new(1.0, 1.0), dim);

    let smooth = |t: f32| 0.5 - 0.5 * (fract(t) * 3.1415).cos();
    let dx = smooth(scaled.x);
    let dy = smooth(scaled.y);

    let center = mix(mix(c, cx, dx), mix(cy, cxy, dx), dy);
    center * 2.0 - 1.0
}

fn corner_gradient(corner: Vector3<f32>) -> Vector3<f32> {
    let gradient = Vector3::new(
        random3(corner),
        random3(corner + Vector3::new(2353.0, 2353.0, 2353.0)),
        random3(corner + Vector3::new(-523.0, -523.0, -523.0)),
    );
    let length = gradient.magnitude();
    if length > 0.0 {
        gradient / length
    } else {
        gradient
    }
}

/// Gradient noise with hashed, normalized corner gradients and a trilinear
/// (unsmoothed) blend of the eight corner dot products.
pub fn perlin3(p: Vector3<f32>, dim: f32) -> f32 {
    let scaled = p * dim;
    let local = scaled.map(fract);
    let cell = scaled - local;

    let mut dots = [0.0_f32; 8];
    for x in 0..2 {
        for y in 0..2 {
            for z in 0..2 {
                let local_corner = Vector3::new(x as f32, y as f32, z as f32);
                let gradient = corner_gradient(cell + local_corner);
                dots[x + y * 2 + z * 4] = gradient.dot(local - local_corner);
            }
        }
    }

    let x00 = mix(dots[0], dots[1], local.x);
    let xy0 = mix(dots[2], dots[3], local.x);
    let x0z = mix(dots[4], dots[5], local.x);
    let xyz = mix(dots[6], dots[7], local.x);

    mix(mix(x00, xy0, local.y), mix(x0z, xyz, local.y), local.z)
}

/// Fractal value noise: 8 octaves starting at frequency 2 and amplitude 0.5,
/// each octave doubling frequency and halving amplitude, then remapped by
/// `smoothstep(0.25, 0.75, total^1.3)^1.03`.
pub fn fbm(x: f32, y: f32) -> f32 {
    let mut total = 0.0_f32;
    let mut frequency = 2.0_f32;
    let mut amplitude = 0.5_f32;
    for _ in 0..8 {
        total += value_noise(x * frequency, y * frequency) * amplitude;
        frequency *= 2.0;
        amplitude *= 0.5;
    }
    smoothstep(0.25, 0.75, total.powf(1.3)).powf(1.03)
}

/// [`fbm`] as a `noise` crate source.
#[derive(Copy, Clone, Debug, Default)]
pub struct FractalValueNoise;

impl NoiseFn<f64, 2> for FractalValueNoise {
    fn get(&self, point: [f64; 2]) -> f64 {
        fbm(point[0] as f32, point[1] as f32) as f64
    }
}

/// [`worley`] at a fixed cell frequency as a `noise` crate source.
#[derive(Copy, Clone, Debug)]
pub struct WorleyCells {
    /// Cells per world unit
    pub cells: f32,
}

impl NoiseFn<f64, 2> for WorleyCells {
    fn get(&self, point: [f64; 2]) -> f64 {
        worley(Vector2::new(point[0] as f32, point[1] as f32), self.cells) as f64
    }
}

/// [`perlin3`] at a fixed lattice frequency as a `noise` crate source.
#[derive(Copy, Clone, Debug)]
pub struct GradientNoise3 {
    /// Lattice frequency
    pub dim: f32,
}

impl NoiseFn<f64, 3> for GradientNoise3 {
    fn get(&self, point: [f64; 3]) -> f64 {
        perlin3(
            Vector3::new(point[0] as f32, point[1] as f32, point[2] as f32),
            self.dim,
        ) as f64
    }
}
