/*!
The streaming encoder.

An [`Encoder`] wraps any [`Write`] and emits one data item per
[`ToCbor`] value, using the minimal integer form for every auxiliary
value. Mappings are emitted canonically: keys are pre-encoded, sorted by
their payload bytes (length first, then lexicographic), and written in
that order regardless of the source ordering.
*/

use crate::major;
use crate::value::{Bytes, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("don't know how to serialize {0}")]
    Unsupported(&'static str),
}

/// A value the encoder can emit.
pub trait ToCbor {
    fn to_cbor<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Error>;

    /// Encodes a sequence of `Self` as one data item. Sequences of most
    /// element types emit an array; `u8` overrides this so that byte
    /// sequences emit a byte string.
    fn sequence_to_cbor<W: Write>(items: &[Self], enc: &mut Encoder<W>) -> Result<(), Error>
    where
        Self: Sized,
    {
        enc.emit_initial(major::ARRAY, items.len() as u64)?;
        for item in items {
            item.to_cbor(enc)?;
        }
        Ok(())
    }
}

/// Streaming CBOR encoder over `W`.
pub struct Encoder<W> {
    out: W,
    scratch: [u8; 9],
}

impl<W: Write> Encoder<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            scratch: [0; 9],
        }
    }

    /// Emits one value.
    pub fn encode<T: ToCbor + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        value.to_cbor(self)
    }

    /// Writes pre-encoded bytes through unchanged.
    pub fn emit_raw(&mut self, data: &[u8]) -> Result<(), Error> {
        self.out.write_all(data)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Reborrows as an encoder over an erased writer, the form the
    /// record field tables are monomorphized against.
    pub fn erased(&mut self) -> Encoder<&mut dyn Write> {
        Encoder {
            out: &mut self.out as &mut dyn Write,
            scratch: [0; 9],
        }
    }

    /// Writes the initial byte and minimal-length auxiliary value.
    pub(crate) fn emit_initial(&mut self, mtype: u8, aux: u64) -> Result<(), Error> {
        let tag = mtype << 5;
        if aux <= 23 {
            self.scratch[0] = tag | aux as u8;
            self.out.write_all(&self.scratch[..1])?;
        } else if aux <= u8::MAX as u64 {
            self.scratch[0] = tag | 24;
            self.scratch[1] = aux as u8;
            self.out.write_all(&self.scratch[..2])?;
        } else if aux <= u16::MAX as u64 {
            self.scratch[0] = tag | 25;
            self.scratch[1..3].copy_from_slice(&(aux as u16).to_be_bytes());
            self.out.write_all(&self.scratch[..3])?;
        } else if aux <= u32::MAX as u64 {
            self.scratch[0] = tag | 26;
            self.scratch[1..5].copy_from_slice(&(aux as u32).to_be_bytes());
            self.out.write_all(&self.scratch[..5])?;
        } else {
            self.scratch[0] = tag | 27;
            self.scratch[1..9].copy_from_slice(&aux.to_be_bytes());
            self.out.write_all(&self.scratch[..9])?;
        }
        Ok(())
    }

    fn emit_int(&mut self, v: i64) -> Result<(), Error> {
        if v < 0 {
            self.emit_initial(major::NEGATIVE, (-1 - v) as u64)
        } else {
            self.emit_initial(major::UNSIGNED, v as u64)
        }
    }

    // Floats always go out as 8-byte doubles.
    fn emit_float(&mut self, v: f64) -> Result<(), Error> {
        self.scratch[0] = (major::SIMPLE << 5) | 27;
        self.scratch[1..9].copy_from_slice(&v.to_bits().to_be_bytes());
        self.out.write_all(&self.scratch[..9])?;
        Ok(())
    }

    fn emit_text(&mut self, v: &str) -> Result<(), Error> {
        self.emit_initial(major::TEXT, v.len() as u64)?;
        self.out.write_all(v.as_bytes())?;
        Ok(())
    }

    fn emit_bytes(&mut self, v: &[u8]) -> Result<(), Error> {
        self.emit_initial(major::BYTES, v.len() as u64)?;
        self.out.write_all(v)?;
        Ok(())
    }

    fn emit_null(&mut self) -> Result<(), Error> {
        self.emit_initial(major::SIMPLE, 22)
    }

    /// Emits map entries in canonical key order. Keys arrive
    /// pre-encoded; values encode lazily after the sort.
    fn emit_map_entries<T, F>(&mut self, mut entries: Vec<(Vec<u8>, T)>, f: F) -> Result<(), Error>
    where
        F: Fn(T, &mut Self) -> Result<(), Error>,
    {
        self.emit_initial(major::MAP, entries.len() as u64)?;
        entries.sort_by(|(a, _), (b, _)| key_order(a, b));
        for (key, value) in entries {
            self.emit_raw(&key)?;
            f(value, self)?;
        }
        Ok(())
    }
}

/// The canonical key predicate operates on the payload portion of the
/// encoded key: the initial byte and its length prefix are stripped.
fn key_payload(data: &[u8]) -> &[u8] {
    let skip = match data[0] & 0x1F {
        info if info <= 23 => 1,
        24 => 2,
        25 => 3,
        26 => 5,
        27 => 9,
        _ => unreachable!("the encoder never emits reserved or indefinite headers"),
    };
    &data[skip..]
}

pub(crate) fn key_order(a: &[u8], b: &[u8]) -> Ordering {
    let (a, b) = (key_payload(a), key_payload(b));
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Pre-encodes one map key into its own scratch buffer.
fn encode_key<K: ToCbor + ?Sized>(key: &K) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    key.to_cbor(&mut Encoder::new(&mut buf))?;
    Ok(buf)
}

/// Encodes one value into a fresh buffer.
pub fn emit<T: ToCbor + ?Sized>(value: &T) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    value.to_cbor(&mut Encoder::new(&mut buf))?;
    Ok(buf)
}

macro_rules! to_cbor_uint {
    ($($t:ty),*) => {$(
        impl ToCbor for $t {
            fn to_cbor<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Error> {
                enc.emit_initial(major::UNSIGNED, *self as u64)
            }
        }
    )*};
}

to_cbor_uint!(u16, u32, u64, usize);

impl ToCbor for u8 {
    fn to_cbor<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Error> {
        enc.emit_initial(major::UNSIGNED, *self as u64)
    }

    // A sequence of bytes is a byte string, not an array.
    fn sequence_to_cbor<W: Write>(items: &[Self], enc: &mut Encoder<W>) -> Result<(), Error> {
        enc.emit_bytes(items)
    }
}

macro_rules! to_cbor_int {
    ($($t:ty),*) => {$(
        impl ToCbor for $t {
            fn to_cbor<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Error> {
                enc.emit_int(*self as i64)
            }
        }
    )*};
}

to_cbor_int!(i8, i16, i32, i64, isize);

impl ToCbor for f64 {
    fn to_cbor<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Error> {
        enc.emit_float(*self)
    }
}

impl ToCbor for f32 {
    fn to_cbor<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Error> {
        enc.emit_float(f64::from(*self))
    }
}

impl ToCbor for bool {
    fn to_cbor<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Error> {
        enc.emit_initial(major::SIMPLE, if *self { 21 } else { 20 })
    }
}

impl ToCbor for str {
    fn to_cbor<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Error> {
        enc.emit_text(self)
    }
}

impl ToCbor for String {
    fn to_cbor<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Error> {
        enc.emit_text(self)
    }
}

impl ToCbor for Bytes {
    fn to_cbor<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Error> {
        enc.emit_bytes(&self.0)
    }
}

impl<T: ToCbor + ?Sized> ToCbor for &T {
    fn to_cbor<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Error> {
        (**self).to_cbor(enc)
    }
}

impl<T: ToCbor> ToCbor for [T] {
    fn to_cbor<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Error> {
        T::sequence_to_cbor(self, enc)
    }
}

impl<T: ToCbor, const N: usize> ToCbor for [T; N] {
    fn to_cbor<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Error> {
        self.as_slice().to_cbor(enc)
    }
}

impl<T: ToCbor> ToCbor for Vec<T> {
    fn to_cbor<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Error> {
        self.as_slice().to_cbor(enc)
    }
}

impl<T: ToCbor> ToCbor for Option<T> {
    fn to_cbor<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Error> {
        match self {
            Some(value) => value.to_cbor(enc),
            None => enc.emit_null(),
        }
    }
}

impl<K, V> ToCbor for HashMap<K, V>
where
    K: ToCbor + Eq + Hash,
    V: ToCbor,
{
    fn to_cbor<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Error> {
        let mut entries = Vec::with_capacity(self.len());
        for (key, value) in self {
            entries.push((encode_key(key)?, value));
        }
        enc.emit_map_entries(entries, |value, enc| value.to_cbor(enc))
    }
}

impl<K, V> ToCbor for BTreeMap<K, V>
where
    K: ToCbor + Ord,
    V: ToCbor,
{
    fn to_cbor<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Error> {
        let mut entries = Vec::with_capacity(self.len());
        for (key, value) in self {
            entries.push((encode_key(key)?, value));
        }
        enc.emit_map_entries(entries, |value, enc| value.to_cbor(enc))
    }
}

impl ToCbor for Value {
    fn to_cbor<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Error> {
        match self {
            Value::Uint(v) => enc.emit_initial(major::UNSIGNED, *v),
            Value::Int(v) => enc.emit_int(*v),
            Value::Float(v) => enc.emit_float(*v),
            Value::Bool(v) => v.to_cbor(enc),
            Value::Null => enc.emit_null(),
            Value::Text(v) => enc.emit_text(v),
            Value::Bytes(v) => enc.emit_bytes(v),
            Value::Array(items) => {
                enc.emit_initial(major::ARRAY, items.len() as u64)?;
                for item in items {
                    item.to_cbor(enc)?;
                }
                Ok(())
            }
            Value::Map(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (key, value) in map {
                    entries.push((encode_key(key)?, value));
                }
                enc.emit_map_entries(entries, |value, enc| value.to_cbor(enc))
            }
            Value::Bignum(_) => Err(Error::Unsupported("bignum")),
            Value::Tag { .. } => Err(Error::Unsupported("tag")),
        }
    }
}
