//! Background tasks for the rendering side of the terrain.
//!
//! # Available Tasks
//! - `ChunkMeshGenerationTask`: extracts mesh data for one chunk in the background

pub mod chunk_mesh_generation_task;
