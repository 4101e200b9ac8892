//! Rendering side of the terrain.
//!
//! This module contains mesh extraction, the mesh worker task, and the
//! per-chunk GPU state that ties uploaded meshes to draw calls. Everything that
//! touches a [`BufferState`] here runs on the owning thread; workers only
//! produce [`meshing::ChunkMeshData`].

use cgmath::Vector2;

use crate::core::StResource;

use super::buffer_state::{
    BufferHandle, BufferState, BufferUsage, DrawCall, GpuBuffer, PrimitiveTopology, RenderPass,
};
use meshing::{ChunkMeshData, MeshBuffers};

pub mod meshing;
pub mod tasks;
mod vertex;

// Re-export commonly used types
pub use vertex::Vertex;

/// A mesh living in GPU buffers.
///
/// Dropping it frees both buffers.
#[derive(Debug)]
pub struct UploadedMesh {
    vertices: GpuBuffer,
    indices: GpuBuffer,
}

impl UploadedMesh {
    /// Uploads `mesh`, or returns `None` for an empty mesh.
    pub fn upload(buffer_state: &StResource<BufferState>, mesh: &MeshBuffers) -> Option<Self> {
        if mesh.is_empty() {
            return None;
        }
        Some(Self {
            vertices: GpuBuffer::upload(buffer_state, BufferUsage::Vertex, &mesh.vertices),
            indices: GpuBuffer::upload(buffer_state, BufferUsage::Index, &mesh.indices),
        })
    }

    /// Writes `mesh` into these buffers, keeping their handles.
    fn rewrite(&mut self, mesh: &MeshBuffers) {
        self.vertices.write(&mesh.vertices);
        self.indices.write(&mesh.indices);
    }

    /// Uploaded form of `mesh`, reusing `current`'s buffers when there is one.
    fn replace(
        current: Option<Self>,
        buffer_state: &StResource<BufferState>,
        mesh: &MeshBuffers,
    ) -> Option<Self> {
        match current {
            Some(mut uploaded) if !mesh.is_empty() => {
                uploaded.rewrite(mesh);
                Some(uploaded)
            }
            _ => Self::upload(buffer_state, mesh),
        }
    }

    /// Number of indices to draw.
    pub fn index_count(&self) -> u32 {
        self.indices.len()
    }

    /// Handles and count for a draw record.
    pub fn draw_buffers(&self) -> MeshDraw {
        MeshDraw {
            vertices: self.vertices.handle(),
            indices: self.indices.handle(),
            index_count: self.index_count(),
        }
    }
}

/// GPU-side state of one chunk.
#[derive(Debug, Default)]
pub struct ChunkRenderState {
    opaque: Option<UploadedMesh>,
    transparent: Option<UploadedMesh>,
    /// Last sequence handed out by [`next_sequence`](Self::next_sequence)
    issued: u64,
    /// Sequence of the uploaded mesh
    applied: u64,
    buffered: bool,
}

impl ChunkRenderState {
    /// Stamps a new mesh request. Every request gets a larger number than
    /// the one before it.
    pub fn next_sequence(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Whether a mesh requested at `sequence` was overtaken by one already
    /// uploaded.
    pub fn is_superseded(&self, sequence: u64) -> bool {
        sequence < self.applied
    }

    /// Replaces the uploaded meshes with `mesh`. Live buffers are rewritten in
    /// place; buffers whose new mesh is empty are freed.
    pub fn buffer(&mut self, buffer_state: &StResource<BufferState>, mesh: &ChunkMeshData) {
        self.opaque = UploadedMesh::replace(self.opaque.take(), buffer_state, &mesh.opaque);
        self.transparent =
            UploadedMesh::replace(self.transparent.take(), buffer_state, &mesh.transparent);
        self.applied = mesh.sequence;
        self.buffered = true;
    }

    /// Frees both meshes and clears the buffered flag.
    pub fn free(&mut self) {
        self.opaque = None;
        self.transparent = None;
        self.buffered = false;
    }

    /// Whether a mesh has been uploaded since the last [`free`](Self::free).
    pub fn is_buffered(&self) -> bool {
        self.buffered
    }

    /// Draw record for a chunk at `origin`.
    pub fn draw_record(&self, origin: Vector2<i32>) -> ChunkDrawRecord {
        ChunkDrawRecord {
            origin,
            opaque: self.opaque.as_ref().map(UploadedMesh::draw_buffers),
            transparent: self.transparent.as_ref().map(UploadedMesh::draw_buffers),
            ready: self.buffered,
        }
    }
}

/// Buffer handles and index count of one uploaded mesh.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MeshDraw {
    /// Vertex buffer
    pub vertices: BufferHandle,
    /// Index buffer
    pub indices: BufferHandle,
    /// Number of indices
    pub index_count: u32,
}

/// Everything the renderer needs to draw one chunk.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChunkDrawRecord {
    /// World `(x, z)` of the chunk's minimum corner
    pub origin: Vector2<i32>,
    /// Opaque mesh, absent when the chunk has no opaque faces
    pub opaque: Option<MeshDraw>,
    /// Translucent mesh, absent when the chunk has no translucent faces
    pub transparent: Option<MeshDraw>,
    /// Whether the chunk's mesh has been uploaded
    pub ready: bool,
}

impl ChunkDrawRecord {
    /// The draw call for `pass`, if this chunk has geometry in it.
    pub fn draw_call(&self, pass: RenderPass) -> Option<DrawCall> {
        let mesh = match pass {
            RenderPass::Opaque => self.opaque,
            RenderPass::Transparent => self.transparent,
        }?;
        Some(DrawCall {
            origin: self.origin,
            vertices: mesh.vertices,
            indices: mesh.indices,
            index_count: mesh.index_count,
            topology: PrimitiveTopology::Triangles,
            pass,
        })
    }
}
