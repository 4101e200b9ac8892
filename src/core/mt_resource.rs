use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A thread-safe, reference-counted value behind a read-write lock.
///
/// Chunks are stored as `MtResource<Chunk>` so that a block-generation worker can
/// take the write half while the terrain keeps its handle in the chunk map, and
/// mesh workers can read a chunk and its neighbors concurrently.
///
/// Lock poisoning is recovered rather than propagated: a worker that panics while
/// holding a chunk leaves the data in whatever state it reached, and the pool
/// reports the failure separately.
///
/// # Examples
/// ```
/// use voxel_terrain::core::MtResource;
/// use std::thread;
///
/// let counter = MtResource::new(0);
/// let counter_clone = counter.clone();
///
/// thread::spawn(move || *counter_clone.get_mut() += 1)
///     .join()
///     .unwrap();
/// assert_eq!(*counter.get(), 1);
/// ```
pub struct MtResource<T: Send + Sync> {
    resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync> MtResource<T> {
    /// Wraps `resource` in a fresh lock.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Acquires shared read access, blocking while a writer holds the lock.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires exclusive write access, blocking until all readers release.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}
