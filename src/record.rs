/*!
Record (struct) targets.

The original reflection-driven struct support becomes an explicit field
descriptor table: each record type carries a `FIELDS` constant mapping
field names (with optional rename metadata) to in-place sink accessors
and encode hooks. The [`cbor_record!`](crate::cbor_record) macro writes
the table and the trait implementations for a plain struct.
*/

use crate::decode::Error;
use crate::encode::{self, Encoder, ToCbor};
use crate::major;
use crate::sink::{MapSink, Sink};
use std::io::Write;

/// One field of a record.
pub struct FieldDef<T> {
    /// The declared field name.
    pub name: &'static str,
    /// Optional `name[,option]...` metadata; the first token renames the
    /// field, `-` omits it, and an empty token keeps the declared name.
    pub cbor: Option<&'static str>,
    /// Fallback metadata, consulted only when `cbor` is absent.
    pub json: Option<&'static str>,
    /// In-place decode access to the field.
    pub sink: fn(&mut T) -> &mut dyn Sink,
    /// Encodes the field value.
    pub encode: fn(&T, &mut Encoder<&mut dyn Write>) -> Result<(), encode::Error>,
}

impl<T> FieldDef<T> {
    /// The name this field reads and writes as, or `None` if the field
    /// is omitted entirely.
    pub fn resolved_name(&self) -> Option<&'static str> {
        let Some(meta) = self.cbor.or(self.json) else {
            return Some(self.name);
        };
        let token = meta.split(',').next().unwrap_or("");
        match token {
            "-" => None,
            "" => Some(self.name),
            _ => Some(token),
        }
    }
}

/// A type decodable from and encodable to a CBOR map by field name.
pub trait Record: Sized + 'static {
    const FIELDS: &'static [FieldDef<Self>];
}

/// Map sink that routes entries into record fields.
///
/// Keys are forced to text; a byte-string key is reinterpreted as text by
/// the `String` sink. Keys that match no field bind nothing, and the
/// decoder discards their values.
pub struct RecordMap<'a, T: Record> {
    rec: &'a mut T,
    key: String,
}

impl<'a, T: Record> RecordMap<'a, T> {
    pub fn new(rec: &'a mut T) -> Self {
        Self {
            rec,
            key: String::new(),
        }
    }
}

impl<T: Record> MapSink for RecordMap<'_, T> {
    fn key(&mut self) -> Result<&mut dyn Sink, Error> {
        self.key.clear();
        Ok(&mut self.key)
    }

    fn value(&mut self) -> Result<Option<&mut dyn Sink>, Error> {
        for field in T::FIELDS {
            if let Some(name) = field.resolved_name() {
                if name == self.key || name.eq_ignore_ascii_case(&self.key) {
                    return Ok(Some((field.sink)(self.rec)));
                }
            }
        }
        Ok(None)
    }

    fn commit(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn end(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// Emits a record as a map of its usable fields, in declaration order.
pub fn encode_record<T: Record>(
    rec: &T,
    enc: &mut Encoder<&mut dyn Write>,
) -> Result<(), encode::Error> {
    let usable = T::FIELDS
        .iter()
        .filter(|f| f.resolved_name().is_some())
        .count();
    enc.emit_initial(major::MAP, usable as u64)?;
    for field in T::FIELDS {
        if let Some(name) = field.resolved_name() {
            name.to_cbor(enc)?;
            (field.encode)(rec, enc)?;
        }
    }
    Ok(())
}

#[doc(hidden)]
#[macro_export]
macro_rules! __field_meta {
    () => {
        ::std::option::Option::None
    };
    ($m:literal) => {
        ::std::option::Option::Some($m)
    };
}

/// Declares the CBOR field table for a struct, making it usable as a
/// decode target and an encode source.
///
/// Fields not listed are ignored on both sides. A field may carry a
/// metadata literal with the usual `name[,option]...` rules:
///
/// ```ignore
/// struct Landmark {
///     name: String,
///     elevation: i32,
///     notes: String,
/// }
///
/// cbor_record!(Landmark {
///     name,
///     elevation: "elev",
///     notes: "-",
/// });
/// ```
#[macro_export]
macro_rules! cbor_record {
    ($ty:ident { $($field:ident $(: $meta:literal)?),+ $(,)? }) => {
        impl $crate::record::Record for $ty {
            const FIELDS: &'static [$crate::record::FieldDef<Self>] = &[
                $(
                    $crate::record::FieldDef {
                        name: stringify!($field),
                        cbor: $crate::__field_meta!($($meta)?),
                        json: ::std::option::Option::None,
                        sink: {
                            fn sink(rec: &mut $ty) -> &mut dyn $crate::sink::Sink {
                                &mut rec.$field
                            }
                            sink
                        },
                        encode: {
                            fn encode(
                                rec: &$ty,
                                enc: &mut $crate::encode::Encoder<&mut dyn ::std::io::Write>,
                            ) -> ::std::result::Result<(), $crate::encode::Error> {
                                $crate::encode::ToCbor::to_cbor(&rec.$field, enc)
                            }
                            encode
                        },
                    }
                ),+
            ];
        }

        impl $crate::sink::Sink for $ty {
            fn kind(&self) -> &'static str {
                concat!("record ", stringify!($ty))
            }

            fn begin_map(
                &mut self,
            ) -> ::std::result::Result<
                ::std::boxed::Box<dyn $crate::sink::MapSink + '_>,
                $crate::decode::Error,
            > {
                ::std::result::Result::Ok(::std::boxed::Box::new(
                    $crate::record::RecordMap::new(self),
                ))
            }
        }

        impl $crate::encode::ToCbor for $ty {
            fn to_cbor<W: ::std::io::Write>(
                &self,
                enc: &mut $crate::encode::Encoder<W>,
            ) -> ::std::result::Result<(), $crate::encode::Error> {
                $crate::record::encode_record(self, &mut enc.erased())
            }
        }
    };
}
