//! # Direction Module
//!
//! The six axis-aligned face directions of a block, in the order faces are
//! emitted by the mesher.

use cgmath::Vector3;

/// An axis-aligned face direction.
///
/// The four horizontal directions also index a chunk's neighbor links.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum Direction {
    /// +x
    XPOS,
    /// -x
    XNEG,
    /// +y
    YPOS,
    /// -y
    YNEG,
    /// +z
    ZPOS,
    /// -z
    ZNEG,
}

impl Direction {
    /// Face emission order used by the mesher.
    pub const MESH_ORDER: [Direction; 6] = [
        Direction::XPOS,
        Direction::XNEG,
        Direction::ZPOS,
        Direction::ZNEG,
        Direction::YPOS,
        Direction::YNEG,
    ];

    /// The directions along which chunks link to each other.
    pub const HORIZONTAL: [Direction; 4] = [
        Direction::XPOS,
        Direction::XNEG,
        Direction::ZPOS,
        Direction::ZNEG,
    ];

    /// The direction pointing the other way.
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::XPOS => Direction::XNEG,
            Direction::XNEG => Direction::XPOS,
            Direction::YPOS => Direction::YNEG,
            Direction::YNEG => Direction::YPOS,
            Direction::ZPOS => Direction::ZNEG,
            Direction::ZNEG => Direction::ZPOS,
        }
    }

    /// Unit step in this direction.
    pub const fn offset(self) -> Vector3<i32> {
        match self {
            Direction::XPOS => Vector3::new(1, 0, 0),
            Direction::XNEG => Vector3::new(-1, 0, 0),
            Direction::YPOS => Vector3::new(0, 1, 0),
            Direction::YNEG => Vector3::new(0, -1, 0),
            Direction::ZPOS => Vector3::new(0, 0, 1),
            Direction::ZNEG => Vector3::new(0, 0, -1),
        }
    }

    /// Slot of a horizontal direction in a neighbor-link array, `None` for ±y.
    pub const fn horizontal_index(self) -> Option<usize> {
        match self {
            Direction::XPOS => Some(0),
            Direction::XNEG => Some(1),
            Direction::ZPOS => Some(2),
            Direction::ZNEG => Some(3),
            Direction::YPOS | Direction::YNEG => None,
        }
    }

    /// Index into per-face tables laid out as `[XPOS, XNEG, YPOS, YNEG, ZPOS, ZNEG]`.
    pub const fn face_index(self) -> usize {
        self as usize
    }

    /// The face a ray enters through when it steps along `axis` with the given sign.
    ///
    /// Stepping toward +x enters the cell through its -x face.
    pub fn entered_face(axis: usize, step: i32) -> Direction {
        match (axis, step > 0) {
            (0, true) => Direction::XNEG,
            (0, false) => Direction::XPOS,
            (1, true) => Direction::YNEG,
            (1, false) => Direction::YPOS,
            (_, true) => Direction::ZNEG,
            (_, false) => Direction::ZPOS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_offsets_cancel() {
        for direction in Direction::MESH_ORDER {
            assert_eq!(direction.opposite().opposite(), direction);
            assert_eq!(
                direction.offset() + direction.opposite().offset(),
                Vector3::new(0, 0, 0)
            );
        }
    }

    #[test]
    fn horizontal_slots_are_distinct() {
        let slots: Vec<usize> = Direction::HORIZONTAL
            .iter()
            .filter_map(|d| d.horizontal_index())
            .collect();
        assert_eq!(slots, vec![0, 1, 2, 3]);
        assert_eq!(Direction::YPOS.horizontal_index(), None);
    }
}
