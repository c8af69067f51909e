/*!
The dynamic value model.

When the caller does not know the shape of the incoming data, decoding
targets a [`Value`], which can hold any CBOR data item as a tree.
*/

use num_bigint::BigInt;

/// A dynamically typed CBOR data item.
///
/// Maps are kept as an ordered pair list rather than a keyed collection:
/// CBOR map keys may be floats or nested containers, which have no total
/// order or hash, and the encoder sorts keys canonically on output anyway.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Major type 0.
    Uint(u64),
    /// Major type 1, within the `i64` range.
    Int(i64),
    /// Tag 2/3 bignums, and negative integers beyond the `i64` range.
    Bignum(BigInt),
    /// Major type 7 half, single and double floats, widened to `f64`.
    Float(f64),
    /// Major type 2.
    Bytes(Vec<u8>),
    /// Major type 3.
    Text(String),
    /// Major type 4.
    Array(Vec<Value>),
    /// Major type 5, in wire order.
    Map(Vec<(Value, Value)>),
    /// Major type 7, simple values 20 and 21.
    Bool(bool),
    /// Major type 7, simple value 22.
    #[default]
    Null,
    /// A tag with no registered handler, kept opaque.
    Tag { tag: u64, content: Box<Value> },
}

impl Value {
    /// Looks up a map entry by key, by linear scan in wire order.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// A byte-string decode target and encode source.
///
/// `Vec<u8>`, `[u8; N]`, and `&[u8]` all encode as byte strings, but a
/// `Vec<u8>` decode target fills from an array of integers: the blanket
/// `Vec<T>` sink cannot special-case its element type. `Bytes` is the
/// target that accepts a CBOR byte string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl From<Vec<u8>> for Bytes {
    fn from(buf: Vec<u8>) -> Self {
        Bytes(buf)
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
