//! # Voxel Task System
//!
//! This module contains tasks related to voxel world generation. They run on
//! the terrain's worker pool so zone generation never stalls the owning thread.

pub mod block_generation_task;
