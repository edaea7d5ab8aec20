//! RAII scope that disposes every reference it created

use std::sync::Arc;

use super::ObjectRef;
use crate::context::InteropContext;

/// Type-erased view of a wrapper, for disposal only.
trait Disposable: Send + Sync {
    fn dispose(&self);
}

impl<T: Send + Sync + 'static> Disposable for ObjectRef<T> {
    fn dispose(&self) {
        ObjectRef::dispose(self);
    }
}

/// Scope for references that live for one call.
///
/// Every wrapper created through the scope is disposed when the scope is
/// dropped, on normal return and on `?` early return alike.
///
/// # Example
///
/// ```
/// use refbroker::InteropContext;
///
/// let ctx = InteropContext::new();
/// {
///     let mut scope = ctx.scope();
///     let wrapper = scope.wrap(vec![1, 2, 3]);
///     let json = refbroker::codec::to_string(&scope, &wrapper).unwrap();
///     assert_eq!(json, r#"{"__dotNetObject":1}"#);
///     assert_eq!(ctx.registry().len(), 1);
/// }
/// assert!(ctx.registry().is_empty());
/// ```
pub struct RefScope<'a> {
    ctx: &'a InteropContext,
    owned: Vec<Arc<dyn Disposable>>,
}

impl InteropContext {
    /// Open a scope whose wrappers are released when it is dropped.
    pub fn scope(&self) -> RefScope<'_> {
        RefScope {
            ctx: self,
            owned: Vec::new(),
        }
    }
}

impl<'a> RefScope<'a> {
    /// Wrap `value`; the wrapper is disposed when this scope ends.
    pub fn wrap<T: Send + Sync + 'static>(&mut self, value: T) -> Arc<ObjectRef<T>> {
        self.adopt(Arc::new(ObjectRef::new(value)))
    }

    /// Take responsibility for disposing an existing wrapper.
    pub fn adopt<T: Send + Sync + 'static>(&mut self, wrapper: Arc<ObjectRef<T>>) -> Arc<ObjectRef<T>> {
        self.owned.push(wrapper.clone());
        wrapper
    }

    /// Number of wrappers owned by this scope.
    pub fn len(&self) -> usize {
        self.owned.len()
    }

    /// Whether this scope owns no wrappers.
    pub fn is_empty(&self) -> bool {
        self.owned.is_empty()
    }
}

impl<'a> Drop for RefScope<'a> {
    fn drop(&mut self) {
        for wrapper in self.owned.drain(..) {
            wrapper.dispose();
        }
    }
}

impl<'a> std::ops::Deref for RefScope<'a> {
    type Target = InteropContext;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}
