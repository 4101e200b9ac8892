//! # Buffer State Module
//!
//! This module provides the boundary between terrain meshes and the GPU. It
//! handles buffer allocation, uploads, freeing and draw submission, and keeps
//! analytics about buffer usage.
//!
//! ## Key Features
//!
//! * A [`GpuBackend`] trait standing in for the render context
//! * A central registry of live buffers with per-buffer analytics
//! * [`GpuBuffer`], a scoped handle that frees its backend buffer on drop
//! * [`HeadlessBackend`], an in-memory backend for tools and tests
//!
//! ## Architecture
//!
//! The `BufferState` struct is owned by the terrain's thread and shared with
//! every live [`GpuBuffer`] through a [`StResource`]. Because `StResource` is
//! `Rc`-based, neither the registry nor any handle can cross to a worker thread;
//! workers only ever produce plain vertex and index vectors, and the owning
//! thread uploads them during its drain step.
//!
//! ## Performance Considerations
//!
//! * Uploads are whole-buffer: a remeshed chunk gets fresh buffers and its old
//!   handles are dropped, which frees them immediately
//! * Analytics are a handful of integer updates per call

use std::collections::HashMap;
use std::fmt::{self, Debug};

use bytemuck::NoUninit;
use cgmath::Vector2;
use log::{debug, warn};

use crate::core::StResource;

/// Opaque identifier of a buffer owned by a [`GpuBackend`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// What a buffer is bound as when drawing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    /// Interleaved vertex data
    Vertex,
    /// `u32` triangle indices
    Index,
}

/// How indices are assembled into primitives.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum PrimitiveTopology {
    /// Every three indices form a triangle
    #[default]
    Triangles,
}

/// Which of the two terrain passes a draw belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RenderPass {
    /// Back-face culled, drawn first
    Opaque,
    /// Drawn second without back-face culling
    Transparent,
}

/// One indexed draw submitted to the backend.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DrawCall {
    /// World `(x, z)` translation of the chunk-local mesh
    pub origin: Vector2<i32>,
    /// Vertex buffer to read
    pub vertices: BufferHandle,
    /// Index buffer to read
    pub indices: BufferHandle,
    /// Number of indices to draw
    pub index_count: u32,
    /// Primitive assembly
    pub topology: PrimitiveTopology,
    /// Pass this draw belongs to
    pub pass: RenderPass,
}

/// The render context's buffer operations.
///
/// Every method must be called on the thread that owns the render context.
pub trait GpuBackend {
    /// Allocates an empty buffer.
    fn allocate(&mut self, usage: BufferUsage) -> BufferHandle;
    /// Replaces the buffer's contents with `data`.
    fn upload(&mut self, handle: BufferHandle, data: &[u8]);
    /// Releases the buffer. The handle is invalid afterwards.
    fn free(&mut self, handle: BufferHandle);
    /// Issues one indexed draw.
    fn draw_indexed(&mut self, call: &DrawCall);
}

/// Analytics data for a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq)]
struct BufferAnalytics {
    /// How the buffer is bound
    usage: BufferUsage,
    /// Size of the last upload in bytes
    used_memory: u64,
    /// Number of uploads
    times_written: u64,
}

/// Central registry for GPU buffers
///
/// Wraps the backend and tracks every buffer it has allocated and not yet freed.
pub struct BufferState {
    backend: Box<dyn GpuBackend>,
    buffer_analytics: HashMap<BufferHandle, BufferAnalytics>,
    draw_calls: u64,
    indices_drawn: u64,
}

impl BufferState {
    /// Creates a registry over `backend`.
    pub fn new(backend: Box<dyn GpuBackend>) -> Self {
        Self {
            backend,
            buffer_analytics: HashMap::new(),
            draw_calls: 0,
            indices_drawn: 0,
        }
    }

    /// Allocates a buffer and fills it with `data`.
    ///
    /// # Arguments
    /// * `usage` - How the buffer will be bound
    /// * `data` - Initial contents
    ///
    /// # Returns
    /// The backend handle of the new buffer
    pub fn create_buffer_init(&mut self, usage: BufferUsage, data: &[u8]) -> BufferHandle {
        let handle = self.backend.allocate(usage);
        self.backend.upload(handle, data);
        self.buffer_analytics.insert(
            handle,
            BufferAnalytics {
                usage,
                used_memory: data.len() as u64,
                times_written: 1,
            },
        );
        handle
    }

    /// Replaces the contents of a live buffer.
    ///
    /// Writes to unknown handles are logged and ignored.
    pub fn write_buffer(&mut self, handle: BufferHandle, data: &[u8]) {
        let Some(analytics) = self.buffer_analytics.get_mut(&handle) else {
            warn!("Write to unknown buffer {:?} ignored", handle);
            return;
        };
        self.backend.upload(handle, data);
        analytics.used_memory = data.len() as u64;
        analytics.times_written += 1;
    }

    /// Frees a live buffer. Freeing an unknown handle is a no-op.
    pub fn free_buffer(&mut self, handle: BufferHandle) {
        if self.buffer_analytics.remove(&handle).is_some() {
            self.backend.free(handle);
        } else {
            debug!("Double free of buffer {:?} ignored", handle);
        }
    }

    /// Submits a draw to the backend.
    pub fn draw_indexed(&mut self, call: &DrawCall) {
        self.backend.draw_indexed(call);
        self.draw_calls += 1;
        self.indices_drawn += call.index_count as u64;
    }

    /// Returns `true` if `handle` names a live buffer.
    pub fn contains(&self, handle: BufferHandle) -> bool {
        self.buffer_analytics.contains_key(&handle)
    }

    /// Number of live buffers.
    pub fn live_buffers(&self) -> usize {
        self.buffer_analytics.len()
    }

    /// Number of live buffers bound as `usage`.
    pub fn live_buffers_of(&self, usage: BufferUsage) -> usize {
        self.buffer_analytics
            .values()
            .filter(|analytics| analytics.usage == usage)
            .count()
    }

    /// Gets the total used memory across all live buffers
    ///
    /// # Returns
    ///
    /// Total used memory in bytes
    pub fn get_total_used_memory(&self) -> u64 {
        self.buffer_analytics
            .values()
            .fold(0, |acc, analytics| acc + analytics.used_memory)
    }

    /// Total uploads across live buffers.
    pub fn get_total_writes(&self) -> u64 {
        self.buffer_analytics
            .values()
            .fold(0, |acc, analytics| acc + analytics.times_written)
    }

    /// Draws submitted since creation.
    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    /// Indices submitted since creation.
    pub fn indices_drawn(&self) -> u64 {
        self.indices_drawn
    }
}

/// A live GPU buffer that frees itself when dropped.
///
/// # Panics
/// Dropping a `GpuBuffer` locks the registry for writing. Never drop one while
/// holding a guard from the same [`StResource<BufferState>`].
pub struct GpuBuffer {
    buffer_state: StResource<BufferState>,
    handle: BufferHandle,
    len: u32,
}

impl GpuBuffer {
    /// Uploads `data` into a new buffer.
    ///
    /// # Arguments
    /// * `buffer_state` - Registry that owns the buffer
    /// * `usage` - How the buffer will be bound
    /// * `data` - Elements to upload; `len()` records their count
    pub fn upload<T: NoUninit>(
        buffer_state: &StResource<BufferState>,
        usage: BufferUsage,
        data: &[T],
    ) -> Self {
        let handle = buffer_state
            .get_mut()
            .create_buffer_init(usage, bytemuck::cast_slice(data));
        Self {
            buffer_state: buffer_state.clone(),
            handle,
            len: data.len() as u32,
        }
    }

    /// Replaces the buffer's contents with `data`, keeping its handle.
    pub fn write<T: NoUninit>(&mut self, data: &[T]) {
        self.buffer_state
            .get_mut()
            .write_buffer(self.handle, bytemuck::cast_slice(data));
        self.len = data.len() as u32;
    }

    /// Backend handle.
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    /// Number of elements uploaded.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Returns `true` if the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Debug for GpuBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuBuffer")
            .field("handle", &self.handle)
            .field("len", &self.len)
            .finish()
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        self.buffer_state.get_mut().free_buffer(self.handle);
    }
}

/// In-memory backend that records sizes and counts instead of talking to a GPU.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    buffers: HashMap<BufferHandle, usize>,
    next_handle: u64,
    bytes_uploaded: u64,
}

impl HeadlessBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GpuBackend for HeadlessBackend {
    fn allocate(&mut self, _usage: BufferUsage) -> BufferHandle {
        let handle = BufferHandle(self.next_handle);
        self.next_handle += 1;
        self.buffers.insert(handle, 0);
        handle
    }

    fn upload(&mut self, handle: BufferHandle, data: &[u8]) {
        match self.buffers.get_mut(&handle) {
            Some(size) => {
                *size = data.len();
                self.bytes_uploaded += data.len() as u64;
            }
            None => warn!("Upload to freed buffer {:?}", handle),
        }
    }

    fn free(&mut self, handle: BufferHandle) {
        self.buffers.remove(&handle);
    }

    fn draw_indexed(&mut self, call: &DrawCall) {
        let known = |handle| self.buffers.contains_key(&handle);
        if !known(call.vertices) || !known(call.indices) {
            warn!("Draw at {:?} references a freed buffer", call.origin);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> StResource<BufferState> {
        StResource::new(BufferState::new(Box::new(HeadlessBackend::new())))
    }

    #[test]
    fn dropping_a_handle_frees_the_buffer() {
        let buffer_state = registry();
        let buffer = GpuBuffer::upload(&buffer_state, BufferUsage::Index, &[0u32, 1, 2]);
        assert_eq!(buffer.len(), 3);
        assert!(buffer_state.get().contains(buffer.handle()));
        assert_eq!(buffer_state.get().get_total_used_memory(), 12);

        drop(buffer);
        assert_eq!(buffer_state.get().live_buffers(), 0);
        assert_eq!(buffer_state.get().get_total_used_memory(), 0);
    }

    #[test]
    fn writes_and_draws_are_counted() {
        let buffer_state = registry();
        let mut vertices = GpuBuffer::upload(&buffer_state, BufferUsage::Vertex, &[0.0f32; 8]);
        let indices = GpuBuffer::upload(&buffer_state, BufferUsage::Index, &[0u32; 6]);
        vertices.write(&[1.0f32; 4]);
        assert_eq!(vertices.len(), 4);
        buffer_state.get_mut().draw_indexed(&DrawCall {
            origin: Vector2::new(16, -32),
            vertices: vertices.handle(),
            indices: indices.handle(),
            index_count: indices.len(),
            topology: PrimitiveTopology::Triangles,
            pass: RenderPass::Opaque,
        });

        let state = buffer_state.get();
        assert_eq!(state.live_buffers_of(BufferUsage::Vertex), 1);
        assert_eq!(state.get_total_writes(), 3);
        assert_eq!(state.draw_calls(), 1);
        assert_eq!(state.indices_drawn(), 6);
    }

    #[test]
    fn freeing_twice_is_harmless() {
        let buffer_state = registry();
        let handle = buffer_state
            .get_mut()
            .create_buffer_init(BufferUsage::Vertex, &[1, 2, 3]);
        buffer_state.get_mut().free_buffer(handle);
        buffer_state.get_mut().free_buffer(handle);
        assert_eq!(buffer_state.get().live_buffers(), 0);
    }
}
