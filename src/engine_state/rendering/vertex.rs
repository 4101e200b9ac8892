//! Vertex data structures and layouts for terrain meshes.
//!
//! This module defines the interleaved vertex format produced by mesh extraction
//! and consumed by the GPU boundary.

use cgmath::Vector3;

/// A vertex of a terrain mesh.
///
/// Every attribute is a 4-vector so the layout has no padding and can be
/// uploaded verbatim with `bytemuck::cast_slice`.
///
/// # Memory Layout
/// - Position: [f32; 4], `w = 1` (16 bytes)
/// - Normal: [f32; 4], `w = 0` (16 bytes)
/// - UV: [f32; 4] as `(u, v, alpha, animated)` (16 bytes)
///
/// Total size: 48 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Chunk-local position
    pub position: [f32; 4],
    /// Outward face normal
    pub normal: [f32; 4],
    /// Atlas coordinates, alpha, and the animation flag
    pub uv: [f32; 4],
}

impl Vertex {
    /// Creates a new vertex.
    ///
    /// # Arguments
    /// * `position` - Chunk-local corner position
    /// * `normal` - Unit normal of the face the corner belongs to
    /// * `uv` - `(u, v, alpha, animated)`
    pub fn new(position: Vector3<f32>, normal: Vector3<i32>, uv: [f32; 4]) -> Self {
        Vertex {
            position: [position.x, position.y, position.z, 1.0],
            normal: [normal.x as f32, normal.y as f32, normal.z as f32, 0.0],
            uv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 48);
        let vertex = Vertex::new(Vector3::new(1.0, 2.0, 3.0), Vector3::new(0, -1, 0), [0.5; 4]);
        let bytes: &[u8] = bytemuck::bytes_of(&vertex);
        assert_eq!(bytes.len(), std::mem::size_of::<Vertex>());
        assert_eq!(vertex.position[3], 1.0);
        assert_eq!(vertex.normal, [0.0, -1.0, 0.0, 0.0]);
    }
}
