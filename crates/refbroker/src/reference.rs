//! Reference wrapper marking a host object as "pass by reference"

mod guard;

pub use guard::RefScope;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::context::InteropContext;
use crate::error::{BrokerError, Result};
use crate::registry::Handle;

/// The context currently tracking a wrapper, and the handle it issued.
struct Tracking {
    context: InteropContext,
    handle: Handle,
}

impl Tracking {
    /// False once the handle was released behind the wrapper's back,
    /// e.g. by a remote release call.
    fn is_live(&self) -> bool {
        self.context.registry().contains(self.handle)
    }
}

/// Wraps a host object so it crosses the interop boundary as a handle
/// instead of as serialized state.
///
/// A wrapper is untracked until it is first encoded. Encoding registers the
/// object with the encoding context and fixes the handle. Disposing (or
/// dropping) the wrapper releases the handle again.
///
/// # Example
///
/// ```
/// use refbroker::{InteropContext, ObjectRef};
///
/// let ctx = InteropContext::new();
/// let wrapper = ObjectRef::new(String::from("widget"));
/// assert!(!wrapper.is_tracked());
///
/// let handle = wrapper.track_using(&ctx).unwrap();
/// assert_eq!(wrapper.track_using(&ctx).unwrap(), handle);
/// assert!(ctx.registry().contains(handle));
///
/// wrapper.dispose();
/// assert!(!ctx.registry().contains(handle));
/// assert_eq!(wrapper.value(), "widget");
/// ```
pub struct ObjectRef<T: Send + Sync + 'static> {
    value: Arc<T>,
    tracking: Mutex<Option<Tracking>>,
}

impl<T: Send + Sync + 'static> ObjectRef<T> {
    /// Create an untracked wrapper around `value`.
    pub fn new(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Create an untracked wrapper around an already shared object.
    pub fn from_arc(value: Arc<T>) -> Self {
        Self {
            value,
            tracking: Mutex::new(None),
        }
    }

    /// The wrapped object.
    ///
    /// Available in every state, including after disposal: disposal removes
    /// the handle mapping, not the object.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// The wrapped object as a shared pointer.
    pub fn value_arc(&self) -> Arc<T> {
        Arc::clone(&self.value)
    }

    /// The current handle, or [`Handle::NONE`] while untracked.
    pub fn handle(&self) -> Handle {
        self.lock()
            .as_ref()
            .filter(|tracking| tracking.is_live())
            .map_or(Handle::NONE, |tracking| tracking.handle)
    }

    /// Whether any context currently tracks this wrapper.
    pub fn is_tracked(&self) -> bool {
        self.lock().as_ref().is_some_and(Tracking::is_live)
    }

    /// Whether `ctx` currently tracks this wrapper.
    pub fn is_tracked_by(&self, ctx: &InteropContext) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|tracking| tracking.context.same_context(ctx) && tracking.is_live())
    }

    /// Register with `ctx` on first use and return the handle.
    ///
    /// Repeated calls with the same context return the same handle without
    /// registering again. A handle the remote side already released counts
    /// as untracked, so the wrapper registers again under a fresh handle.
    ///
    /// # Errors
    ///
    /// `InvalidState` if a different context tracks this wrapper. The
    /// wrapper is left unchanged.
    pub fn track_using(&self, ctx: &InteropContext) -> Result<Handle> {
        let mut tracking = self.lock();

        if tracking.as_ref().is_some_and(|current| !current.is_live()) {
            *tracking = None;
        }

        if let Some(current) = tracking.as_ref() {
            if !current.context.same_context(ctx) {
                return Err(BrokerError::InvalidState(
                    "reference is already being tracked by a different context".to_string(),
                ));
            }
            debug_assert!(!current.handle.is_none(), "tracked wrapper without a handle");
            return Ok(current.handle);
        }

        let object: Arc<dyn std::any::Any + Send + Sync> = self.value_arc();
        let handle = ctx.registry().track_object(object);
        if ctx.config().trace {
            tracing::debug!(
                handle = handle.raw(),
                ty = std::any::type_name::<T>(),
                "reference tracked"
            );
        }
        *tracking = Some(Tracking {
            context: ctx.clone(),
            handle,
        });
        Ok(handle)
    }

    /// Stop tracking and return to the untracked state.
    ///
    /// A no-op when untracked. Safe after the remote side has already
    /// released the handle.
    pub fn dispose(&self) {
        if let Some(Tracking { context, handle }) = self.lock().take() {
            context.release(handle);
            if context.config().trace {
                tracing::debug!(handle = handle.raw(), "reference disposed");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Tracking>> {
        self.tracking.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Send + Sync + 'static> Drop for ObjectRef<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for ObjectRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("type", &std::any::type_name::<T>())
            .field("handle", &self.handle())
            .finish()
    }
}

impl InteropContext {
    /// Wrap `value` for passing by reference through this context.
    ///
    /// The wrapper stays untracked until it is encoded.
    pub fn wrap<T: Send + Sync + 'static>(&self, value: T) -> ObjectRef<T> {
        ObjectRef::new(value)
    }
}
