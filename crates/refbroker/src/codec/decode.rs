//! Decoding: envelopes resolve back to the tracked objects

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::{self, DeserializeOwned, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};

use super::{Codec, Plain};
use crate::error::BrokerError;
use crate::reference::ObjectRef;
use crate::registry::Handle;

/// Deserialization that may resolve references against the codec's context.
pub trait Decode: Sized {
    /// Deserialize a value, resolving any envelopes through `codec`.
    fn decode<'de, D: Deserializer<'de>>(codec: &Codec<'_>, deserializer: D) -> Result<Self, D::Error>;
}

/// A codec-bound seed, usable anywhere serde wants `DeserializeSeed`.
pub struct DecodeSeed<'a, T> {
    codec: &'a Codec<'a>,
    marker: PhantomData<fn() -> T>,
}

impl<'a, T> DecodeSeed<'a, T> {
    /// Bind a seed for `T` to `codec`.
    pub fn new(codec: &'a Codec<'a>) -> Self {
        Self {
            codec,
            marker: PhantomData,
        }
    }
}

impl<'de, 'a, T: Decode> DeserializeSeed<'de> for DecodeSeed<'a, T> {
    type Value = T;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<T, D::Error> {
        T::decode(self.codec, deserializer)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Envelopes
// ═══════════════════════════════════════════════════════════════════════

/// Scans `{ "<marker-key>": <handle> }` and yields the handle.
///
/// Every token other than the one marker property ends the scan with a
/// typed error naming what was found.
struct EnvelopeVisitor<'a> {
    codec: &'a Codec<'a>,
}

impl<'a> EnvelopeVisitor<'a> {
    fn reject<E: de::Error>(&self, found: String) -> E {
        self.codec.de_error(BrokerError::malformed(
            format!("object with single property `{}`", self.codec.marker_key()),
            found,
        ))
    }
}

impl<'de, 'a> Visitor<'de> for EnvelopeVisitor<'a> {
    type Value = Handle;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a reference envelope {{\"{}\": <handle>}}", self.codec.marker_key())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Handle, A::Error> {
        let key = self.codec.marker_key();
        let mut handle = Handle::NONE;
        let mut seen = false;

        while let Some(name) = map.next_key::<String>()? {
            if !seen && name == key {
                let raw = map.next_value_seed(HandleSeed { codec: self.codec })?;
                handle = Handle::from_raw(raw);
                seen = true;
            } else {
                return Err(self.codec.de_error(BrokerError::malformed(
                    format!("property `{key}`"),
                    format!("property `{name}`"),
                )));
            }
        }

        if handle.is_none() {
            return Err(self.codec.de_error(BrokerError::MissingProperty {
                key: key.to_string(),
            }));
        }
        Ok(handle)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Handle, E> {
        Err(self.reject(format!("boolean `{v}`")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Handle, E> {
        Err(self.reject(format!("integer `{v}`")))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Handle, E> {
        Err(self.reject(format!("integer `{v}`")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Handle, E> {
        Err(self.reject(format!("number `{v}`")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Handle, E> {
        Err(self.reject(format!("string {v:?}")))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Handle, E> {
        Err(self.reject("null".to_string()))
    }

    fn visit_none<E: de::Error>(self) -> Result<Handle, E> {
        Err(self.reject("null".to_string()))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, _seq: A) -> Result<Handle, A::Error> {
        Err(self.reject("array".to_string()))
    }
}

/// The value of the marker property: a 64-bit integer.
struct HandleSeed<'a> {
    codec: &'a Codec<'a>,
}

impl<'a> HandleSeed<'a> {
    fn reject<E: de::Error>(&self, found: String) -> E {
        self.codec
            .de_error(BrokerError::malformed("64-bit integer handle", found))
    }
}

impl<'de, 'a> DeserializeSeed<'de> for HandleSeed<'a> {
    type Value = i64;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<i64, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de, 'a> Visitor<'de> for HandleSeed<'a> {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a 64-bit integer handle")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
        i64::try_from(v).map_err(|_| self.reject(format!("integer `{v}` out of range")))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<i64, E> {
        Err(self.reject(format!("boolean `{v}`")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
        Err(self.reject(format!("number `{v}`")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
        Err(self.reject(format!("string {v:?}")))
    }

    fn visit_unit<E: de::Error>(self) -> Result<i64, E> {
        Err(self.reject("null".to_string()))
    }

    fn visit_none<E: de::Error>(self) -> Result<i64, E> {
        Err(self.reject("null".to_string()))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, _seq: A) -> Result<i64, A::Error> {
        Err(self.reject("array".to_string()))
    }

    fn visit_map<A: MapAccess<'de>>(self, _map: A) -> Result<i64, A::Error> {
        Err(self.reject("object".to_string()))
    }
}

impl<T: Send + Sync + 'static> Decode for ObjectRef<T> {
    fn decode<'de, D: Deserializer<'de>>(codec: &Codec<'_>, deserializer: D) -> Result<Self, D::Error> {
        let handle = deserializer.deserialize_any(EnvelopeVisitor { codec })?;

        let object = codec
            .context()
            .resolve(handle)
            .map_err(|err| codec.de_error::<D::Error>(err))?;

        let value = object.downcast::<T>().map_err(|_| {
            codec.de_error::<D::Error>(BrokerError::TypeMismatch {
                handle,
                expected: std::any::type_name::<T>(),
            })
        })?;

        Ok(ObjectRef::from_arc(value))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Pointers and options
// ═══════════════════════════════════════════════════════════════════════

impl<T: Decode> Decode for Box<T> {
    fn decode<'de, D: Deserializer<'de>>(codec: &Codec<'_>, deserializer: D) -> Result<Self, D::Error> {
        T::decode(codec, deserializer).map(Box::new)
    }
}

impl<T: Decode> Decode for Arc<T> {
    fn decode<'de, D: Deserializer<'de>>(codec: &Codec<'_>, deserializer: D) -> Result<Self, D::Error> {
        T::decode(codec, deserializer).map(Arc::new)
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode<'de, D: Deserializer<'de>>(codec: &Codec<'_>, deserializer: D) -> Result<Self, D::Error> {
        struct OptionVisitor<'a, T> {
            codec: &'a Codec<'a>,
            marker: PhantomData<fn() -> T>,
        }

        impl<'de, 'a, T: Decode> Visitor<'de> for OptionVisitor<'a, T> {
            type Value = Option<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an optional value")
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
                T::decode(self.codec, deserializer).map(Some)
            }
        }

        deserializer.deserialize_option(OptionVisitor {
            codec,
            marker: PhantomData,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Sequences and maps
// ═══════════════════════════════════════════════════════════════════════

impl<T: Decode> Decode for Vec<T> {
    fn decode<'de, D: Deserializer<'de>>(codec: &Codec<'_>, deserializer: D) -> Result<Self, D::Error> {
        struct VecVisitor<'a, T> {
            codec: &'a Codec<'a>,
            marker: PhantomData<fn() -> T>,
        }

        impl<'de, 'a, T: Decode> Visitor<'de> for VecVisitor<'a, T> {
            type Value = Vec<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an array")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
                while let Some(item) = seq.next_element_seed(DecodeSeed::new(self.codec))? {
                    items.push(item);
                }
                Ok(items)
            }
        }

        deserializer.deserialize_seq(VecVisitor {
            codec,
            marker: PhantomData,
        })
    }
}

/// Shared visitor for string-keyed maps.
struct MapVisitor<'a, M, T> {
    codec: &'a Codec<'a>,
    marker: PhantomData<fn() -> (M, T)>,
}

impl<'de, 'a, M, T> Visitor<'de> for MapVisitor<'a, M, T>
where
    M: Default + Extend<(String, T)>,
    T: Decode,
{
    type Value = M;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<M, A::Error> {
        let mut out = M::default();
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value_seed(DecodeSeed::<T>::new(self.codec))?;
            out.extend(std::iter::once((key, value)));
        }
        Ok(out)
    }
}

impl<T: Decode> Decode for IndexMap<String, T> {
    fn decode<'de, D: Deserializer<'de>>(codec: &Codec<'_>, deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(MapVisitor {
            codec,
            marker: PhantomData,
        })
    }
}

impl<T: Decode> Decode for BTreeMap<String, T> {
    fn decode<'de, D: Deserializer<'de>>(codec: &Codec<'_>, deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(MapVisitor {
            codec,
            marker: PhantomData,
        })
    }
}

macro_rules! tuple_decode {
    ($len:expr => $($n:tt $name:ident)+) => {
        impl<$($name: Decode),+> Decode for ($($name,)+) {
            fn decode<'de, D: Deserializer<'de>>(codec: &Codec<'_>, deserializer: D) -> Result<Self, D::Error> {
                struct TupleVisitor<'a, $($name),+> {
                    codec: &'a Codec<'a>,
                    marker: PhantomData<fn() -> ($($name,)+)>,
                }

                impl<'de, 'a, $($name: Decode),+> Visitor<'de> for TupleVisitor<'a, $($name),+> {
                    type Value = ($($name,)+);

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        write!(f, "an array of length {}", $len)
                    }

                    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                        Ok(($(
                            match seq.next_element_seed(DecodeSeed::<$name>::new(self.codec))? {
                                Some(value) => value,
                                None => return Err(de::Error::invalid_length($n, &self)),
                            },
                        )+))
                    }
                }

                deserializer.deserialize_tuple($len, TupleVisitor {
                    codec,
                    marker: PhantomData,
                })
            }
        }
    };
}

tuple_decode!(1 => 0 T0);
tuple_decode!(2 => 0 T0 1 T1);
tuple_decode!(3 => 0 T0 1 T1 2 T2);
tuple_decode!(4 => 0 T0 1 T1 2 T2 3 T3);
tuple_decode!(5 => 0 T0 1 T1 2 T2 3 T3 4 T4);
tuple_decode!(6 => 0 T0 1 T1 2 T2 3 T3 4 T4 5 T5);

// ═══════════════════════════════════════════════════════════════════════
// Plain data
// ═══════════════════════════════════════════════════════════════════════

impl<T: DeserializeOwned> Decode for Plain<T> {
    fn decode<'de, D: Deserializer<'de>>(_codec: &Codec<'_>, deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Plain)
    }
}

macro_rules! plain_decode {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Decode for $ty {
                fn decode<'de, D: Deserializer<'de>>(_codec: &Codec<'_>, deserializer: D) -> Result<Self, D::Error> {
                    <$ty as Deserialize>::deserialize(deserializer)
                }
            }
        )+
    };
}

plain_decode!(
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
    String,
    serde_json::Value,
);
