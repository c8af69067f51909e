/*!
CBOR is IETF RFC 7049, the "Concise Binary Object Representation"
<http://tools.ietf.org/html/rfc7049>

It can be thought of as "binary JSON" but is a superset and somewhat richer
representation than JSON.

This crate provides a streaming codec for it: a [`decode::Decoder`] that
reads one value at a time from any [`std::io::Read`] and deposits it into a
caller-supplied target (any type implementing [`sink::Sink`] - fixed-width
integers, floats, strings, byte buffers, growable and fixed sequences,
maps, records, or the fully dynamic [`Value`]), and an [`encode::Encoder`]
that writes any [`encode::ToCbor`] value to a [`std::io::Write`] with
canonical map-key ordering.

Semantic tags 2 and 3 (bignums) are handled natively; other tags can be
intercepted by registering a [`tag::TagHandler`] on the decoder.
*/

pub mod decode;
pub mod encode;
pub mod record;
pub mod sink;
pub mod tag;
pub mod value;


#[cfg(test)]
mod encode_tests;

pub use value::{Bytes, Value};

/// Major type values, per RFC 7049 §2.1.
pub(crate) mod major {
    pub const UNSIGNED: u8 = 0;
    pub const NEGATIVE: u8 = 1;
    pub const BYTES: u8 = 2;
    pub const TEXT: u8 = 3;
    pub const ARRAY: u8 = 4;
    pub const MAP: u8 = 5;
    pub const TAG: u8 = 6;
    pub const SIMPLE: u8 = 7;
}

/// Initial byte of the break marker terminating indefinite-length items.
pub(crate) const BREAK: u8 = 0xFF;
