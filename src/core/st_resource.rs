use std::{
    rc::Rc,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// A single-threaded, reference-counted value with interior mutability.
///
/// Used for state owned by the terrain's thread that several owners need to
/// reach, such as the GPU buffer registry shared between the terrain and every
/// live [`GpuBuffer`](crate::engine_state::buffer_state::GpuBuffer)
/// handle.
///
/// # Panics
/// Acquiring the write half while a guard is alive on the same thread deadlocks
/// or panics, as with any `RwLock`. Keep guards short-lived.
pub struct StResource<T> {
    resource: Rc<RwLock<T>>,
}

impl<T> StResource<T> {
    /// Wraps `resource`.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Rc::new(RwLock::new(resource)),
        }
    }

    /// Shared read access.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive write access.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Clone for StResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}
