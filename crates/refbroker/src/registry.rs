//! Reference registry: the handle-to-object table of one context

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{BrokerError, Result};

/// A type-erased object owned by the host and reachable through a handle.
pub type TrackedObject = Arc<dyn Any + Send + Sync>;

/// Opaque identifier of a tracked object.
///
/// Handles are positive and never reused once released. The raw value 0
/// means "no object" and is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(i64);

impl Handle {
    /// The reserved "no object" handle.
    pub const NONE: Handle = Handle(0);

    /// Wrap a raw wire value.
    pub fn from_raw(raw: i64) -> Self {
        Handle(raw)
    }

    /// The raw wire value.
    pub fn raw(self) -> i64 {
        self.0
    }

    /// Whether this is the reserved handle 0.
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracks live objects by handle.
///
/// All operations take `&self`: the live map is a `DashMap` and the counter
/// is atomic, so callers on different threads need no extra locking.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use refbroker::ReferenceRegistry;
///
/// let registry = ReferenceRegistry::new();
/// let handle = registry.track_object(Arc::new("hello".to_string()));
/// assert_eq!(handle.raw(), 1);
///
/// let obj = registry.resolve(handle).unwrap();
/// assert_eq!(obj.downcast_ref::<String>().map(String::as_str), Some("hello"));
///
/// registry.release(handle);
/// assert!(registry.resolve(handle).is_err());
/// ```
#[derive(Default)]
pub struct ReferenceRegistry {
    /// Last issued handle; incremented before use, so the first handle is 1
    next_id: AtomicI64,

    /// Live objects by raw handle
    live: DashMap<i64, TrackedObject>,
}

impl ReferenceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `obj` and return its fresh handle.
    ///
    /// The entry is inserted before the handle is returned, so any thread
    /// that later learns the handle can resolve it. At most `i64::MAX`
    /// handles are issued per registry.
    pub fn track_object(&self, obj: TrackedObject) -> Handle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        debug_assert!(id > 0, "handle space exhausted");
        self.live.insert(id, obj);
        tracing::trace!(handle = id, "tracking object");
        Handle(id)
    }

    /// Look up the object behind `handle`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the handle was never issued here or was released.
    pub fn resolve(&self, handle: Handle) -> Result<TrackedObject> {
        self.live
            .get(&handle.0)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(BrokerError::NotFound { handle })
    }

    /// Alias of [`resolve`](Self::resolve) used by the call-dispatch layer.
    pub fn find_object(&self, handle: Handle) -> Result<TrackedObject> {
        self.resolve(handle)
    }

    /// Stop tracking `handle`.
    ///
    /// Releasing an absent handle is a no-op, so host-side disposal and a
    /// remote release may race freely.
    pub fn release(&self, handle: Handle) {
        if self.live.remove(&handle.0).is_some() {
            tracing::trace!(handle = handle.0, "released object");
        }
    }

    /// Whether `handle` is currently live.
    pub fn contains(&self, handle: Handle) -> bool {
        self.live.contains_key(&handle.0)
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether no handle is live.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

impl fmt::Debug for ReferenceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceRegistry")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .field("live", &self.live.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_handle_is_one() {
        let registry = ReferenceRegistry::new();
        assert_eq!(registry.track_object(Arc::new(1u8)), Handle(1));
        assert_eq!(registry.track_object(Arc::new(2u8)), Handle(2));
    }

    #[test]
    fn test_resolve_returns_same_instance() {
        let registry = ReferenceRegistry::new();
        let obj: TrackedObject = Arc::new(String::from("x"));
        let handle = registry.track_object(Arc::clone(&obj));
        let found = registry.resolve(handle).unwrap();
        assert!(Arc::ptr_eq(&obj, &found));
    }

    #[test]
    fn test_release_is_idempotent() {
        let registry = ReferenceRegistry::new();
        let handle = registry.track_object(Arc::new(()));
        registry.release(handle);
        registry.release(handle);
        registry.release(Handle(999));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handle_zero_never_resolves() {
        let registry = ReferenceRegistry::new();
        registry.track_object(Arc::new(()));
        assert!(registry.resolve(Handle::NONE).unwrap_err().is_not_found());
    }

    #[test]
    fn test_handles_not_reused_after_release() {
        let registry = ReferenceRegistry::new();
        let a = registry.track_object(Arc::new(()));
        registry.release(a);
        let b = registry.track_object(Arc::new(()));
        assert!(b > a);
    }
}
