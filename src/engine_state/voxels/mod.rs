//! # Voxel Terrain Core
//!
//! This module contains the voxel world itself: block types, chunks, the
//! procedural generator that fills them, and the terrain container that streams
//! them in and out around the player.
//!
//! ## Architecture
//!
//! The voxel system is organized into several key components:
//!
//! * **Block**: block types, face directions, and the static UV and physics tables
//! * **Noise / Biome / Structures**: deterministic functions of world coordinates
//!   that decide what goes where
//! * **Chunk**: a 16 × 256 × 16 block grid and its terrain generation
//! * **Terrain**: the chunk map, zone streaming, and block edits
//! * **Ray March**: grid traversal for collision sweeps and edits
//! * **Tasks**: zone block generation on the worker pool
//!
//! ## Performance Considerations
//!
//! * Chunks are generated a zone (16 chunks) per task, sharing one column cache
//! * Mesh extraction runs on workers; only the upload happens on the owner
//! * Block data is never discarded, so revisiting a zone only costs a re-mesh
//!
//! ## Data Flow
//!
//! 1. The player moves; `Terrain::multithread` notices zones entering range
//! 2. New zones get a block generation task, known zones get mesh tasks
//! 3. Finished block data fans out into mesh tasks for the chunk and its neighbors
//! 4. Finished meshes are uploaded and become drawable
//!
//! ## Thread Safety
//!
//! * Chunks live in `MtResource`s; workers lock them, the owner rarely does
//! * All GPU work stays on the thread that owns the `Terrain`

pub mod biome;
pub mod block;
pub mod chunk;
pub mod noise;
pub mod ray_march;
pub mod structures;
pub mod tasks;
pub mod terrain;
