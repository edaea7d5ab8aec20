//! JSON codec that carries references as `{ "<marker-key>": <handle> }`
//!
//! Serde has no notion of serializer state, so the context travels
//! explicitly: [`Encode`] and [`Decode`] take a [`Codec`] that borrows the
//! [`InteropContext`], and the adapters [`Encoded`] / [`DecodeSeed`] plug
//! those traits into `serde::Serialize` / `serde::de::DeserializeSeed` so
//! references can sit at any depth inside ordinary JSON data.
//!
//! # Example
//!
//! ```
//! use indexmap::IndexMap;
//! use refbroker::{codec, InteropContext, ObjectRef};
//!
//! let ctx = InteropContext::new();
//! let a = ObjectRef::new("a");
//! let mut named = IndexMap::new();
//! named.insert("b".to_string(), ObjectRef::new("b"));
//!
//! let json = codec::to_string(&ctx, &(&a, &named)).unwrap();
//! assert_eq!(json, r#"[{"__dotNetObject":1},{"b":{"__dotNetObject":2}}]"#);
//!
//! let back: Vec<ObjectRef<&str>> = codec::from_str(&ctx, r#"[{"__dotNetObject":2}]"#).unwrap();
//! assert_eq!(*back[0].value(), "b");
//! ```

mod decode;
mod encode;

pub use decode::{Decode, DecodeSeed};
pub use encode::{Encode, Encoded};

use std::cell::RefCell;

use serde::{de, ser};

use crate::context::InteropContext;
use crate::error::{BrokerError, Result};

/// Passes ordinary serde data through the codec unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Plain<T>(pub T);

/// State of one encode or decode call.
///
/// Holds the context and the first typed [`BrokerError`] raised inside a
/// serde callback. Serde only lets errors cross its boundary as text, so
/// [`finish`](Self::finish) swaps the serializer's error for the typed one.
pub struct Codec<'a> {
    ctx: &'a InteropContext,
    failure: RefCell<Option<BrokerError>>,
}

impl<'a> Codec<'a> {
    /// Start a codec call against `ctx`.
    pub fn new(ctx: &'a InteropContext) -> Self {
        Self {
            ctx,
            failure: RefCell::new(None),
        }
    }

    /// The context references are tracked in and resolved against.
    pub fn context(&self) -> &'a InteropContext {
        self.ctx
    }

    /// Reserved property name of the envelope.
    pub fn marker_key(&self) -> &'a str {
        self.ctx.marker_key()
    }

    /// Record `err` and convert it for a serializer.
    pub fn ser_error<E: ser::Error>(&self, err: BrokerError) -> E {
        let converted = E::custom(&err);
        self.record(err);
        converted
    }

    /// Record `err` and convert it for a deserializer.
    pub fn de_error<E: de::Error>(&self, err: BrokerError) -> E {
        let converted = E::custom(&err);
        self.record(err);
        converted
    }

    /// Map the serializer's result to a broker result, preferring the
    /// recorded typed error over the serializer's own.
    pub fn finish<T>(self, result: serde_json::Result<T>) -> Result<T> {
        result.map_err(|err| {
            let err = self
                .failure
                .into_inner()
                .unwrap_or(BrokerError::Json(err));
            tracing::debug!(error = %err, "reference codec failed");
            err
        })
    }

    fn record(&self, err: BrokerError) {
        let mut slot = self.failure.borrow_mut();
        if slot.is_none() {
            *slot = Some(err);
        }
    }
}

/// Encode `value` to a JSON string, tracking references in `ctx`.
pub fn to_string<T: Encode + ?Sized>(ctx: &InteropContext, value: &T) -> Result<String> {
    let codec = Codec::new(ctx);
    let result = serde_json::to_string(&Encoded::new(&codec, value));
    codec.finish(result)
}

/// Encode `value` to JSON bytes, tracking references in `ctx`.
pub fn to_vec<T: Encode + ?Sized>(ctx: &InteropContext, value: &T) -> Result<Vec<u8>> {
    let codec = Codec::new(ctx);
    let result = serde_json::to_vec(&Encoded::new(&codec, value));
    codec.finish(result)
}

/// Encode `value` to a `serde_json::Value`, tracking references in `ctx`.
pub fn to_value<T: Encode + ?Sized>(ctx: &InteropContext, value: &T) -> Result<serde_json::Value> {
    let codec = Codec::new(ctx);
    let result = serde_json::to_value(Encoded::new(&codec, value));
    codec.finish(result)
}

/// Decode a JSON string, resolving references against `ctx`.
pub fn from_str<T: Decode>(ctx: &InteropContext, json: &str) -> Result<T> {
    let codec = Codec::new(ctx);
    let mut de = serde_json::Deserializer::from_str(json);
    let result = T::decode(&codec, &mut de).and_then(|value| de.end().map(|()| value));
    codec.finish(result)
}

/// Decode JSON bytes, resolving references against `ctx`.
pub fn from_slice<T: Decode>(ctx: &InteropContext, json: &[u8]) -> Result<T> {
    let codec = Codec::new(ctx);
    let mut de = serde_json::Deserializer::from_slice(json);
    let result = T::decode(&codec, &mut de).and_then(|value| de.end().map(|()| value));
    codec.finish(result)
}

/// Decode a `serde_json::Value`, resolving references against `ctx`.
pub fn from_value<T: Decode>(ctx: &InteropContext, value: serde_json::Value) -> Result<T> {
    let codec = Codec::new(ctx);
    let result = T::decode(&codec, value);
    codec.finish(result)
}
