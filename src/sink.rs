/*!
Decode targets.

The decoder never inspects the caller's types directly; it drives a
[`Sink`], which routes each decoded item into the destination. A sink is
either bound in place to a caller-owned location (the implementations on
the primitive and container types below) or owns a fresh dynamic cell
(the implementation on [`Value`]).

Sinks live for one call into the decoder. Container descent creates a
child [`ArraySink`] or [`MapSink`], which is discarded after `end`.
*/

use crate::decode::Error;
use crate::value::{Bytes, Value};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Receives one decoded data item.
///
/// Every operation defaults to a type-mismatch error; implementations
/// override the shapes they can hold.
pub trait Sink {
    /// Target description used in mismatch errors.
    fn kind(&self) -> &'static str;

    fn set_uint(&mut self, _v: u64) -> Result<(), Error> {
        Err(Error::Mismatch("unsigned integer", self.kind()))
    }

    fn set_int(&mut self, _v: i64) -> Result<(), Error> {
        Err(Error::Mismatch("integer", self.kind()))
    }

    fn set_bignum(&mut self, _v: BigInt) -> Result<(), Error> {
        Err(Error::Mismatch("bignum", self.kind()))
    }

    fn set_bytes(&mut self, _v: Vec<u8>) -> Result<(), Error> {
        Err(Error::Mismatch("byte string", self.kind()))
    }

    fn set_text(&mut self, _v: String) -> Result<(), Error> {
        Err(Error::Mismatch("text string", self.kind()))
    }

    fn set_f32(&mut self, _v: f32) -> Result<(), Error> {
        Err(Error::Mismatch("float", self.kind()))
    }

    fn set_f64(&mut self, _v: f64) -> Result<(), Error> {
        Err(Error::Mismatch("float", self.kind()))
    }

    fn set_bool(&mut self, _v: bool) -> Result<(), Error> {
        Err(Error::Mismatch("boolean", self.kind()))
    }

    fn set_null(&mut self) -> Result<(), Error> {
        Err(Error::Mismatch("null", self.kind()))
    }

    /// Receives the finalized form of a tagged item: the post-decode
    /// result of a registered handler, or the opaque
    /// [`Value::Tag`] record when no handler claimed the tag code.
    fn set_tag(&mut self, _tag: u64, _v: Value) -> Result<(), Error> {
        Err(Error::Mismatch("tag", self.kind()))
    }

    /// Begins an array. `len_hint` is the declared length for
    /// definite-length arrays and 0 for indefinite ones.
    fn begin_array(&mut self, _len_hint: usize) -> Result<Box<dyn ArraySink + '_>, Error> {
        Err(Error::Mismatch("array", self.kind()))
    }

    fn begin_map(&mut self) -> Result<Box<dyn MapSink + '_>, Error> {
        Err(Error::Mismatch("map", self.kind()))
    }
}

/// Array descent: one `element`/`append` pair per item, then `end`.
pub trait ArraySink {
    /// Returns the sink for the next element.
    fn element(&mut self) -> Result<&mut dyn Sink, Error>;

    /// Commits the element decoded into the last `element` sink.
    fn append(&mut self) -> Result<(), Error>;

    fn end(&mut self) -> Result<(), Error>;
}

/// Map descent: `key`, then `value`, then `commit`, per entry, then `end`.
pub trait MapSink {
    /// Returns the sink for the next key.
    fn key(&mut self) -> Result<&mut dyn Sink, Error>;

    /// Returns the sink for the value belonging to the key just decoded,
    /// or `None` if the key binds nothing; the decoder then consumes and
    /// discards the value.
    fn value(&mut self) -> Result<Option<&mut dyn Sink>, Error>;

    /// Commits the entry decoded into the last `key`/`value` sinks.
    fn commit(&mut self) -> Result<(), Error>;

    fn end(&mut self) -> Result<(), Error>;
}

macro_rules! uint_sink {
    ($($t:ty => $name:literal),* $(,)?) => {$(
        impl Sink for $t {
            fn kind(&self) -> &'static str {
                $name
            }

            fn set_uint(&mut self, v: u64) -> Result<(), Error> {
                *self = v.try_into().map_err(|_| Error::UintOverflow(v, $name))?;
                Ok(())
            }
        }
    )*};
}

uint_sink!(
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    usize => "usize",
);

macro_rules! int_sink {
    ($($t:ty => $name:literal),* $(,)?) => {$(
        impl Sink for $t {
            fn kind(&self) -> &'static str {
                $name
            }

            fn set_uint(&mut self, v: u64) -> Result<(), Error> {
                *self = v.try_into().map_err(|_| Error::UintOverflow(v, $name))?;
                Ok(())
            }

            fn set_int(&mut self, v: i64) -> Result<(), Error> {
                *self = v.try_into().map_err(|_| Error::IntOverflow(v, $name))?;
                Ok(())
            }
        }
    )*};
}

int_sink!(
    i8 => "i8",
    i16 => "i16",
    isize => "isize",
);

// i32 and i64 additionally accept bignums whose magnitude bit length is
// strictly below the target width.
macro_rules! wide_int_sink {
    ($($t:ty => $name:literal, $bits:literal),* $(,)?) => {$(
        impl Sink for $t {
            fn kind(&self) -> &'static str {
                $name
            }

            fn set_uint(&mut self, v: u64) -> Result<(), Error> {
                *self = v.try_into().map_err(|_| Error::UintOverflow(v, $name))?;
                Ok(())
            }

            fn set_int(&mut self, v: i64) -> Result<(), Error> {
                *self = v.try_into().map_err(|_| Error::IntOverflow(v, $name))?;
                Ok(())
            }

            fn set_bignum(&mut self, v: BigInt) -> Result<(), Error> {
                if v.bits() >= $bits {
                    return Err(Error::BignumOverflow($name));
                }
                *self = v.to_i64().ok_or(Error::BignumOverflow($name))? as $t;
                Ok(())
            }
        }
    )*};
}

wide_int_sink!(
    i32 => "i32", 32,
    i64 => "i64", 64,
);

impl Sink for f32 {
    fn kind(&self) -> &'static str {
        "f32"
    }

    fn set_f32(&mut self, v: f32) -> Result<(), Error> {
        *self = v;
        Ok(())
    }

    fn set_f64(&mut self, v: f64) -> Result<(), Error> {
        *self = v as f32;
        Ok(())
    }
}

impl Sink for f64 {
    fn kind(&self) -> &'static str {
        "f64"
    }

    fn set_f32(&mut self, v: f32) -> Result<(), Error> {
        *self = f64::from(v);
        Ok(())
    }

    fn set_f64(&mut self, v: f64) -> Result<(), Error> {
        *self = v;
        Ok(())
    }
}

impl Sink for bool {
    fn kind(&self) -> &'static str {
        "bool"
    }

    fn set_bool(&mut self, v: bool) -> Result<(), Error> {
        *self = v;
        Ok(())
    }
}

impl Sink for String {
    fn kind(&self) -> &'static str {
        "string"
    }

    fn set_text(&mut self, v: String) -> Result<(), Error> {
        *self = v;
        Ok(())
    }

    // Byte strings are reinterpreted as text when the target is a string;
    // record keys rely on this.
    fn set_bytes(&mut self, v: Vec<u8>) -> Result<(), Error> {
        *self = String::from_utf8(v)?;
        Ok(())
    }
}

impl Sink for Bytes {
    fn kind(&self) -> &'static str {
        "byte buffer"
    }

    fn set_bytes(&mut self, v: Vec<u8>) -> Result<(), Error> {
        self.0 = v;
        Ok(())
    }
}

impl<T: Sink + Default> Sink for Option<T> {
    fn kind(&self) -> &'static str {
        "optional value"
    }

    fn set_uint(&mut self, v: u64) -> Result<(), Error> {
        self.get_or_insert_with(T::default).set_uint(v)
    }

    fn set_int(&mut self, v: i64) -> Result<(), Error> {
        self.get_or_insert_with(T::default).set_int(v)
    }

    fn set_bignum(&mut self, v: BigInt) -> Result<(), Error> {
        self.get_or_insert_with(T::default).set_bignum(v)
    }

    fn set_bytes(&mut self, v: Vec<u8>) -> Result<(), Error> {
        self.get_or_insert_with(T::default).set_bytes(v)
    }

    fn set_text(&mut self, v: String) -> Result<(), Error> {
        self.get_or_insert_with(T::default).set_text(v)
    }

    fn set_f32(&mut self, v: f32) -> Result<(), Error> {
        self.get_or_insert_with(T::default).set_f32(v)
    }

    fn set_f64(&mut self, v: f64) -> Result<(), Error> {
        self.get_or_insert_with(T::default).set_f64(v)
    }

    fn set_bool(&mut self, v: bool) -> Result<(), Error> {
        self.get_or_insert_with(T::default).set_bool(v)
    }

    fn set_null(&mut self) -> Result<(), Error> {
        *self = None;
        Ok(())
    }

    fn set_tag(&mut self, tag: u64, v: Value) -> Result<(), Error> {
        self.get_or_insert_with(T::default).set_tag(tag, v)
    }

    fn begin_array(&mut self, len_hint: usize) -> Result<Box<dyn ArraySink + '_>, Error> {
        self.get_or_insert_with(T::default).begin_array(len_hint)
    }

    fn begin_map(&mut self) -> Result<Box<dyn MapSink + '_>, Error> {
        self.get_or_insert_with(T::default).begin_map()
    }
}

impl<T: Sink + Default> Sink for Vec<T> {
    fn kind(&self) -> &'static str {
        "sequence"
    }

    fn begin_array(&mut self, len_hint: usize) -> Result<Box<dyn ArraySink + '_>, Error> {
        self.reserve(len_hint);
        Ok(Box::new(VecSink {
            out: self,
            item: T::default(),
        }))
    }
}

struct VecSink<'a, T> {
    out: &'a mut Vec<T>,
    item: T,
}

impl<T: Sink + Default> ArraySink for VecSink<'_, T> {
    fn element(&mut self) -> Result<&mut dyn Sink, Error> {
        self.item = T::default();
        Ok(&mut self.item)
    }

    fn append(&mut self) -> Result<(), Error> {
        self.out.push(std::mem::take(&mut self.item));
        Ok(())
    }

    fn end(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

impl<T: Sink, const N: usize> Sink for [T; N] {
    fn kind(&self) -> &'static str {
        "fixed array"
    }

    fn begin_array(&mut self, _len_hint: usize) -> Result<Box<dyn ArraySink + '_>, Error> {
        Ok(Box::new(SliceSink {
            items: self,
            pos: 0,
        }))
    }
}

struct SliceSink<'a, T> {
    items: &'a mut [T],
    pos: usize,
}

impl<T: Sink> ArraySink for SliceSink<'_, T> {
    fn element(&mut self) -> Result<&mut dyn Sink, Error> {
        self.items
            .get_mut(self.pos)
            .map(|item| item as &mut dyn Sink)
            .ok_or(Error::TooManyItems)
    }

    // In-place targets advance the position; nothing to move.
    fn append(&mut self) -> Result<(), Error> {
        self.pos += 1;
        Ok(())
    }

    fn end(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

impl<K, V> Sink for HashMap<K, V>
where
    K: Sink + Default + Eq + Hash,
    V: Sink + Default,
{
    fn kind(&self) -> &'static str {
        "map"
    }

    fn begin_map(&mut self) -> Result<Box<dyn MapSink + '_>, Error> {
        Ok(Box::new(HashMapSink {
            out: self,
            key: K::default(),
            val: V::default(),
        }))
    }
}

struct HashMapSink<'a, K, V> {
    out: &'a mut HashMap<K, V>,
    key: K,
    val: V,
}

impl<K, V> MapSink for HashMapSink<'_, K, V>
where
    K: Sink + Default + Eq + Hash,
    V: Sink + Default,
{
    fn key(&mut self) -> Result<&mut dyn Sink, Error> {
        self.key = K::default();
        Ok(&mut self.key)
    }

    fn value(&mut self) -> Result<Option<&mut dyn Sink>, Error> {
        self.val = V::default();
        Ok(Some(&mut self.val))
    }

    fn commit(&mut self) -> Result<(), Error> {
        self.out.insert(
            std::mem::take(&mut self.key),
            std::mem::take(&mut self.val),
        );
        Ok(())
    }

    fn end(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

impl<K, V> Sink for BTreeMap<K, V>
where
    K: Sink + Default + Ord,
    V: Sink + Default,
{
    fn kind(&self) -> &'static str {
        "map"
    }

    fn begin_map(&mut self) -> Result<Box<dyn MapSink + '_>, Error> {
        Ok(Box::new(BTreeMapSink {
            out: self,
            key: K::default(),
            val: V::default(),
        }))
    }
}

struct BTreeMapSink<'a, K, V> {
    out: &'a mut BTreeMap<K, V>,
    key: K,
    val: V,
}

impl<K, V> MapSink for BTreeMapSink<'_, K, V>
where
    K: Sink + Default + Ord,
    V: Sink + Default,
{
    fn key(&mut self) -> Result<&mut dyn Sink, Error> {
        self.key = K::default();
        Ok(&mut self.key)
    }

    fn value(&mut self) -> Result<Option<&mut dyn Sink>, Error> {
        self.val = V::default();
        Ok(Some(&mut self.val))
    }

    fn commit(&mut self) -> Result<(), Error> {
        self.out.insert(
            std::mem::take(&mut self.key),
            std::mem::take(&mut self.val),
        );
        Ok(())
    }

    fn end(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

impl Sink for Value {
    fn kind(&self) -> &'static str {
        "dynamic value"
    }

    fn set_uint(&mut self, v: u64) -> Result<(), Error> {
        *self = Value::Uint(v);
        Ok(())
    }

    fn set_int(&mut self, v: i64) -> Result<(), Error> {
        *self = Value::Int(v);
        Ok(())
    }

    fn set_bignum(&mut self, v: BigInt) -> Result<(), Error> {
        *self = Value::Bignum(v);
        Ok(())
    }

    fn set_bytes(&mut self, v: Vec<u8>) -> Result<(), Error> {
        *self = Value::Bytes(v);
        Ok(())
    }

    fn set_text(&mut self, v: String) -> Result<(), Error> {
        *self = Value::Text(v);
        Ok(())
    }

    fn set_f32(&mut self, v: f32) -> Result<(), Error> {
        *self = Value::Float(f64::from(v));
        Ok(())
    }

    fn set_f64(&mut self, v: f64) -> Result<(), Error> {
        *self = Value::Float(v);
        Ok(())
    }

    fn set_bool(&mut self, v: bool) -> Result<(), Error> {
        *self = Value::Bool(v);
        Ok(())
    }

    fn set_null(&mut self) -> Result<(), Error> {
        *self = Value::Null;
        Ok(())
    }

    fn set_tag(&mut self, _tag: u64, v: Value) -> Result<(), Error> {
        *self = v;
        Ok(())
    }

    fn begin_array(&mut self, len_hint: usize) -> Result<Box<dyn ArraySink + '_>, Error> {
        Ok(Box::new(ValueArraySink {
            out: self,
            items: Vec::with_capacity(len_hint),
            item: Value::Null,
        }))
    }

    fn begin_map(&mut self) -> Result<Box<dyn MapSink + '_>, Error> {
        Ok(Box::new(ValueMapSink {
            out: self,
            entries: Vec::new(),
            key: Value::Null,
            val: Value::Null,
        }))
    }
}

struct ValueArraySink<'a> {
    out: &'a mut Value,
    items: Vec<Value>,
    item: Value,
}

impl ArraySink for ValueArraySink<'_> {
    fn element(&mut self) -> Result<&mut dyn Sink, Error> {
        self.item = Value::Null;
        Ok(&mut self.item)
    }

    fn append(&mut self) -> Result<(), Error> {
        self.items.push(std::mem::take(&mut self.item));
        Ok(())
    }

    fn end(&mut self) -> Result<(), Error> {
        *self.out = Value::Array(std::mem::take(&mut self.items));
        Ok(())
    }
}

struct ValueMapSink<'a> {
    out: &'a mut Value,
    entries: Vec<(Value, Value)>,
    key: Value,
    val: Value,
}

impl MapSink for ValueMapSink<'_> {
    fn key(&mut self) -> Result<&mut dyn Sink, Error> {
        self.key = Value::Null;
        Ok(&mut self.key)
    }

    fn value(&mut self) -> Result<Option<&mut dyn Sink>, Error> {
        self.val = Value::Null;
        Ok(Some(&mut self.val))
    }

    fn commit(&mut self) -> Result<(), Error> {
        self.entries.push((
            std::mem::take(&mut self.key),
            std::mem::take(&mut self.val),
        ));
        Ok(())
    }

    fn end(&mut self) -> Result<(), Error> {
        *self.out = Value::Map(std::mem::take(&mut self.entries));
        Ok(())
    }
}
