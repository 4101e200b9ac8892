//! # Ray March Module
//!
//! Voxel traversal for raycasts against the terrain. The player controller uses
//! it for collision sweeps and the editor for digging and placing blocks.
//!
//! ## Algorithm
//!
//! A DDA walk over the unit grid: from the cell containing the origin, step into
//! whichever neighboring cell the ray reaches first, until the ray's length is
//! used up. The origin cell itself is never tested. Every visited cell is looked
//! up through [`BlockQuery`] so the walk works over anything that can answer
//! "what block is here", not just [`Terrain`](super::terrain::Terrain).

use cgmath::{InnerSpace, Vector3};

use super::block::{block_type::BlockType, direction::Direction};
use crate::error::TerrainError;

/// Read access to blocks by world coordinates.
///
/// This is the only way the player controller sees the terrain.
pub trait BlockQuery {
    /// Block at world `(x, y, z)`.
    ///
    /// # Errors
    /// [`TerrainError::NoChunk`] when no chunk covers the column.
    fn block_type_at(&self, x: i32, y: i32, z: i32) -> Result<BlockType, TerrainError>;

    /// Whether a body collides with the block at `(x, y, z)`.
    fn is_solid_at(&self, x: i32, y: i32, z: i32) -> Result<bool, TerrainError> {
        Ok(self.block_type_at(x, y, z)?.physics().is_solid)
    }

    /// Whether a body can swim or climb through the block at `(x, y, z)`.
    fn is_climbable_at(&self, x: i32, y: i32, z: i32) -> Result<bool, TerrainError> {
        Ok(self.block_type_at(x, y, z)?.physics().can_climb)
    }
}

/// The first cell a ray hit.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayHit {
    /// World coordinates of the cell
    pub cell: Vector3<i32>,
    /// Distance along the ray to where it entered the cell
    pub distance: f32,
    /// Face of the cell the ray came through
    pub entered_face: Direction,
}

fn degenerate(direction: Vector3<f32>) -> TerrainError {
    TerrainError::DegenerateRay {
        x: direction.x,
        y: direction.y,
        z: direction.z,
    }
}

/// Walks the grid from `origin` along `direction` for `|direction|` units.
///
/// # Arguments
/// * `origin` - Start of the ray in world space
/// * `direction` - Ray direction; its length is how far to search
/// * `query` - Block lookup
/// * `predicate` - Returns `true` for blocks that stop the ray
///
/// # Returns
/// The first cell whose block satisfies `predicate`, or `None` if the ray runs
/// out first. A zero-length direction searches nothing.
///
/// # Errors
/// - [`TerrainError::DegenerateRay`] if `origin` or `direction` is not finite
/// - [`TerrainError::NoChunk`] if the ray enters a column with no chunk
pub fn grid_march<Q, P>(
    origin: Vector3<f32>,
    direction: Vector3<f32>,
    query: &Q,
    predicate: P,
) -> Result<Option<RayHit>, TerrainError>
where
    Q: BlockQuery + ?Sized,
    P: Fn(BlockType) -> bool,
{
    let finite = |v: Vector3<f32>| v.x.is_finite() && v.y.is_finite() && v.z.is_finite();
    if !finite(origin) || !finite(direction) {
        return Err(degenerate(direction));
    }

    let max_len = direction.magnitude();
    if max_len == 0.0 {
        return Ok(None);
    }
    let dir = direction / max_len;

    let mut cell = Vector3::new(
        origin.x.floor() as i32,
        origin.y.floor() as i32,
        origin.z.floor() as i32,
    );
    let mut step = [0_i32; 3];
    let mut t_max = [f32::INFINITY; 3];
    let mut t_delta = [f32::INFINITY; 3];
    for axis in 0..3 {
        if dir[axis] > 0.0 {
            step[axis] = 1;
            t_max[axis] = ((cell[axis] + 1) as f32 - origin[axis]) / dir[axis];
        } else if dir[axis] < 0.0 {
            step[axis] = -1;
            t_max[axis] = (cell[axis] as f32 - origin[axis]) / dir[axis];
        } else {
            continue;
        }
        t_delta[axis] = 1.0 / dir[axis].abs();
    }

    loop {
        let axis = (0..3)
            .filter(|&axis| step[axis] != 0)
            .min_by(|&a, &b| t_max[a].total_cmp(&t_max[b]))
            .ok_or_else(|| degenerate(direction))?;

        let distance = t_max[axis];
        if distance > max_len {
            return Ok(None);
        }
        cell[axis] += step[axis];
        t_max[axis] += t_delta[axis];

        let block = query.block_type_at(cell.x, cell.y, cell.z)?;
        if predicate(block) {
            return Ok(Some(RayHit {
                cell,
                distance,
                entered_face: Direction::entered_face(axis, step[axis]),
            }));
        }
    }
}
