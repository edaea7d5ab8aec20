//! Synchronous calls into the remote runtime

use crate::codec::{self, Decode, Encode};
use crate::context::InteropContext;
use crate::error::{BrokerError, Result};
use crate::registry::Handle;

/// Carries encoded calls across the runtime boundary.
///
/// Implemented by the embedding layer. Returns the JSON result, or `None`
/// when the callee produced no value.
pub trait Transport {
    /// Invoke `identifier` on the remote side with a JSON array of arguments.
    fn invoke(&self, identifier: &str, args_json: &str) -> std::result::Result<Option<String>, String>;
}

impl InteropContext {
    /// Call `identifier` on the remote side and decode its result.
    ///
    /// `args` is encoded as given; pass a tuple or slice to produce the JSON
    /// argument array. References inside `args` are tracked by this context,
    /// and each handle lives only as long as the caller keeps its
    /// [`ObjectRef`](crate::ObjectRef) (or the [`RefScope`](crate::RefScope)
    /// that owns it) alive. A wrapper created inline in the argument
    /// expression is dropped at the end of the statement, which retires its
    /// handle. A missing or `null` result decodes to `None`.
    pub fn invoke<R, A, T>(&self, transport: &T, identifier: &str, args: &A) -> Result<Option<R>>
    where
        R: Decode,
        A: Encode + ?Sized,
        T: Transport + ?Sized,
    {
        let args_json = codec::to_string(self, args)?;
        tracing::debug!(identifier, args = %args_json, "invoking remote");

        let result = transport
            .invoke(identifier, &args_json)
            .map_err(BrokerError::Transport)?;

        match result.as_deref().map(str::trim) {
            None | Some("") | Some("null") => Ok(None),
            Some(json) => codec::from_str(self, json).map(Some),
        }
    }

    /// Entry point for a "dispose this reference" call from the remote side.
    ///
    /// The remote side only holds the handle, so this releases it directly in
    /// the registry. A wrapper still holding the handle reports itself
    /// untracked afterwards and gets a fresh handle if encoded again.
    pub fn release_from_remote(&self, handle: Handle) {
        tracing::debug!(handle = handle.raw(), "remote release");
        self.release(handle);
    }
}
