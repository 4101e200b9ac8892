//! # Core Module
//!
//! Shared-ownership primitives used to hand data between the owning thread and
//! the worker pool.
//!
//! ## Key Components
//! - `MtResource`: `Arc<RwLock<T>>` wrapper; chunks live in these so workers can
//!   read or fill them while the owner keeps the map
//! - `StResource`: `Rc<RwLock<T>>` wrapper for state that never leaves the owning
//!   thread, such as the GPU buffer registry
//! - `ResultQueue`: mutex-guarded collection workers append to and the owner drains
//!
//! ## Usage
//! ```rust
//! use voxel_terrain::core::{MtResource, ResultQueue};
//!
//! let counter = MtResource::new(0);
//! *counter.get_mut() += 1;
//! assert_eq!(*counter.get(), 1);
//!
//! let queue = ResultQueue::new();
//! queue.push(7);
//! assert_eq!(queue.drain(), vec![7]);
//! ```

pub mod mt_resource;
pub mod result_queue;
pub mod st_resource;

pub use mt_resource::MtResource;
pub use result_queue::ResultQueue;
pub use st_resource::StResource;
