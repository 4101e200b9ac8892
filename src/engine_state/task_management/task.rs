//! # Task System Core Types
//!
//! This module defines the fundamental building blocks of the task system,
//! which runs terrain work on background threads.
//!
//! ## Core Components
//! - `Task`: a unit of work executed on a worker thread
//! - `TaskKind`: what a task does, for logging and failure reports
//! - `TaskFailure`: a task that kept panicking and was abandoned
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and scheduled via `TaskManager::publish_task()`
//! 2. The task's `process()` method is called on a worker thread
//! 3. The task deposits its output into a shared result queue it was built with
//! 4. The owning thread drains the result queues once per tick
//!
//! ## Thread Safety
//! - `Task` must be `Send` to be transferred between threads
//! - Shared state reached by a task must be synchronized (`MtResource`,
//!   `ResultQueue`)

use std::fmt;

use crate::engine_state::voxels::terrain::keys::{to_coords, ChunkKey, ZoneKey};

/// A unit of work that can be executed on a worker thread.
///
/// Tasks own everything they touch and report through result queues rather
/// than return values, so a task can be retried by running `process` again.
///
/// # Implementation Guidelines
/// - Must be `Send` to be transferred between threads
/// - Should be coarse-grained to amortize scheduling overhead
/// - `process` may be called more than once if an earlier call panicked, so
///   it must not assume it runs on pristine state
pub trait Task: Send {
    /// Performs the work.
    ///
    /// A panic is caught by the worker and reported back to the task manager,
    /// which decides whether to retry.
    fn process(&self);

    /// What this task does.
    fn kind(&self) -> TaskKind;
}

/// The kinds of work the terrain schedules.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Block data for every chunk of a zone
    BlockGeneration {
        /// Zone being generated
        zone: ZoneKey,
    },
    /// Mesh data for one chunk
    MeshExtraction {
        /// Chunk being meshed
        chunk: ChunkKey,
    },
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TaskKind::BlockGeneration { zone } => {
                let origin = to_coords(zone);
                write!(f, "block generation for zone ({}, {})", origin.x, origin.y)
            }
            TaskKind::MeshExtraction { chunk } => {
                let origin = to_coords(chunk);
                write!(f, "mesh extraction for chunk ({}, {})", origin.x, origin.y)
            }
        }
    }
}

/// A task abandoned after exhausting its retries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskFailure {
    /// What the task was doing
    pub kind: TaskKind,
    /// How many times it ran
    pub attempts: u32,
    /// Panic message of the last attempt
    pub message: String,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed after {} attempt(s): {}",
            self.kind, self.attempts, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::terrain::keys::to_key;

    #[test]
    fn kinds_describe_their_target() {
        let zone = TaskKind::BlockGeneration {
            zone: to_key(-64, 128),
        };
        assert_eq!(zone.to_string(), "block generation for zone (-64, 128)");

        let failure = TaskFailure {
            kind: TaskKind::MeshExtraction {
                chunk: to_key(16, -16),
            },
            attempts: 3,
            message: "boom".into(),
        };
        assert_eq!(
            failure.to_string(),
            "mesh extraction for chunk (16, -16) failed after 3 attempt(s): boom"
        );
    }
}
