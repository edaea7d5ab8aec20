//! # refbroker
//!
//! A cross-runtime object reference broker.
//!
//! A host runtime passes opaque handles to live objects it owns into a
//! remote runtime, so the remote side can call back against that exact
//! object without the object's state ever being serialized.
//!
//! ## Architecture
//!
//! - **Registry**: assigns, resolves and releases numeric handles
//! - **Context**: owns one registry; every operation takes it explicitly
//! - **Wrapper** ([`ObjectRef`]): marks a value as "pass by reference"
//! - **Codec**: writes wrappers as `{"__dotNetObject": <handle>}` inside
//!   ordinary JSON and resolves such envelopes on the way back
//!
//! ## Example
//!
//! ```
//! use refbroker::{codec, InteropContext, ObjectRef};
//!
//! let ctx = InteropContext::new();
//! let counter = ObjectRef::new(std::sync::atomic::AtomicU32::new(0));
//!
//! let json = codec::to_string(&ctx, &(&counter, "label")).unwrap();
//! assert_eq!(json, r#"[{"__dotNetObject":1},"label"]"#);
//!
//! let back: ObjectRef<std::sync::atomic::AtomicU32> =
//!     codec::from_str(&ctx, r#"{"__dotNetObject":1}"#).unwrap();
//! assert!(std::ptr::eq(back.value(), counter.value()));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod invoke;
pub mod reference;
pub mod registry;

// Re-export main types
pub use codec::{Decode, Encode, Plain};
pub use config::{BrokerConfig, DEFAULT_MARKER_KEY};
pub use context::InteropContext;
pub use error::{BrokerError, Result};
pub use invoke::Transport;
pub use reference::{ObjectRef, RefScope};
pub use registry::{Handle, ReferenceRegistry, TrackedObject};

/// refbroker version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }
}
