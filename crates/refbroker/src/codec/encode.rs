//! Encoding: references become envelopes, everything else serializes as usual

use std::collections::BTreeMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq, SerializeTuple};
use serde::{Serialize, Serializer};

use super::{Codec, Plain};
use crate::reference::ObjectRef;

/// Serialization that may register references with the codec's context.
pub trait Encode {
    /// Serialize `self`, tracking any references through `codec`.
    fn encode<S: Serializer>(&self, codec: &Codec<'_>, serializer: S) -> Result<S::Ok, S::Error>;
}

/// A value paired with its codec, usable anywhere serde wants `Serialize`.
pub struct Encoded<'a, T: ?Sized> {
    codec: &'a Codec<'a>,
    value: &'a T,
}

impl<'a, T: ?Sized> Encoded<'a, T> {
    /// Pair `value` with `codec`.
    pub fn new(codec: &'a Codec<'a>, value: &'a T) -> Self {
        Self { codec, value }
    }
}

impl<'a, T: Encode + ?Sized> Serialize for Encoded<'a, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.encode(self.codec, serializer)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// References
// ═══════════════════════════════════════════════════════════════════════

impl<T: Send + Sync + 'static> Encode for ObjectRef<T> {
    fn encode<S: Serializer>(&self, codec: &Codec<'_>, serializer: S) -> Result<S::Ok, S::Error> {
        let handle = self
            .track_using(codec.context())
            .map_err(|err| codec.ser_error::<S::Error>(err))?;

        let mut envelope = serializer.serialize_map(Some(1))?;
        envelope.serialize_entry(codec.marker_key(), &handle.raw())?;
        envelope.end()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Pointers and options
// ═══════════════════════════════════════════════════════════════════════

impl<T: Encode + ?Sized> Encode for &T {
    fn encode<S: Serializer>(&self, codec: &Codec<'_>, serializer: S) -> Result<S::Ok, S::Error> {
        (**self).encode(codec, serializer)
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode<S: Serializer>(&self, codec: &Codec<'_>, serializer: S) -> Result<S::Ok, S::Error> {
        (**self).encode(codec, serializer)
    }
}

impl<T: Encode + ?Sized> Encode for Arc<T> {
    fn encode<S: Serializer>(&self, codec: &Codec<'_>, serializer: S) -> Result<S::Ok, S::Error> {
        (**self).encode(codec, serializer)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode<S: Serializer>(&self, codec: &Codec<'_>, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Some(value) => serializer.serialize_some(&Encoded::new(codec, value)),
            None => serializer.serialize_none(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Sequences and maps
// ═══════════════════════════════════════════════════════════════════════

impl<T: Encode> Encode for [T] {
    fn encode<S: Serializer>(&self, codec: &Codec<'_>, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for item in self {
            seq.serialize_element(&Encoded::new(codec, item))?;
        }
        seq.end()
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode<S: Serializer>(&self, codec: &Codec<'_>, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_slice().encode(codec, serializer)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode<S: Serializer>(&self, codec: &Codec<'_>, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_slice().encode(codec, serializer)
    }
}

impl<T: Encode> Encode for IndexMap<String, T> {
    fn encode<S: Serializer>(&self, codec: &Codec<'_>, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, &Encoded::new(codec, value))?;
        }
        map.end()
    }
}

impl<T: Encode> Encode for BTreeMap<String, T> {
    fn encode<S: Serializer>(&self, codec: &Codec<'_>, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, &Encoded::new(codec, value))?;
        }
        map.end()
    }
}

macro_rules! tuple_encode {
    ($len:expr => $($n:tt $name:ident)+) => {
        impl<$($name: Encode),+> Encode for ($($name,)+) {
            fn encode<S: Serializer>(&self, codec: &Codec<'_>, serializer: S) -> Result<S::Ok, S::Error> {
                let mut tuple = serializer.serialize_tuple($len)?;
                $(
                    tuple.serialize_element(&Encoded::new(codec, &self.$n))?;
                )+
                tuple.end()
            }
        }
    };
}

tuple_encode!(1 => 0 T0);
tuple_encode!(2 => 0 T0 1 T1);
tuple_encode!(3 => 0 T0 1 T1 2 T2);
tuple_encode!(4 => 0 T0 1 T1 2 T2 3 T3);
tuple_encode!(5 => 0 T0 1 T1 2 T2 3 T3 4 T4);
tuple_encode!(6 => 0 T0 1 T1 2 T2 3 T3 4 T4 5 T5);

// ═══════════════════════════════════════════════════════════════════════
// Plain data
// ═══════════════════════════════════════════════════════════════════════

impl<T: Serialize> Encode for Plain<T> {
    fn encode<S: Serializer>(&self, _codec: &Codec<'_>, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

macro_rules! plain_encode {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Encode for $ty {
                fn encode<S: Serializer>(&self, _codec: &Codec<'_>, serializer: S) -> Result<S::Ok, S::Error> {
                    Serialize::serialize(self, serializer)
                }
            }
        )+
    };
}

plain_encode!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    str,
    String,
    serde_json::Value,
);
