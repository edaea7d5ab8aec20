//! Interop context: the tracking scope that owns a registry

use std::fmt;
use std::sync::Arc;

use crate::config::BrokerConfig;
use crate::error::Result;
use crate::registry::{Handle, ReferenceRegistry, TrackedObject};

struct ContextInner {
    registry: ReferenceRegistry,
    config: BrokerConfig,
}

/// One side of a runtime boundary.
///
/// Cloning is cheap and yields the same context: clones share the registry
/// and compare equal under [`same_context`](Self::same_context). Independent
/// contexts can coexist in one process.
#[derive(Clone)]
pub struct InteropContext {
    inner: Arc<ContextInner>,
}

impl Default for InteropContext {
    fn default() -> Self {
        Self::with_config(BrokerConfig::default())
    }
}

impl InteropContext {
    /// Create a context with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with a custom configuration.
    pub fn with_config(config: BrokerConfig) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                registry: ReferenceRegistry::new(),
                config,
            }),
        }
    }

    /// The registry owned by this context.
    pub fn registry(&self) -> &ReferenceRegistry {
        &self.inner.registry
    }

    /// The configuration of this context.
    pub fn config(&self) -> &BrokerConfig {
        &self.inner.config
    }

    /// Reserved property name of the reference envelope.
    pub fn marker_key(&self) -> &str {
        &self.inner.config.marker_key
    }

    /// Whether `other` is this very context (not merely an equal one).
    pub fn same_context(&self, other: &InteropContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Resolve a handle issued by this context.
    pub fn resolve(&self, handle: Handle) -> Result<TrackedObject> {
        self.inner.registry.resolve(handle)
    }

    /// Release a handle without going through its wrapper.
    pub fn release(&self, handle: Handle) {
        self.inner.registry.release(handle);
    }
}

impl fmt::Debug for InteropContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteropContext")
            .field("registry", &self.inner.registry)
            .field("config", &self.inner.config)
            .finish()
    }
}
