/*!
The streaming decoder.

A [`Decoder`] wraps any [`Read`] and consumes exactly one data item per
call, depositing it into a caller-supplied [`Sink`]. It owns a one-byte
scratch for the initial byte and an eight-byte scratch for the auxiliary
value; string and container contents are allocated fresh per item.

The decoder is a strictly single-threaded object bound to its stream.
After any error the stream position is indeterminate and the decoder must
not be reused.
*/

use crate::sink::{MapSink, Sink};
use crate::tag::TagHandler;
use crate::value::Value;
use crate::{major, BREAK};
use num_bigint::{BigInt, Sign};
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("reserved additional-information value {0}")]
    ReservedInfo(u8),

    #[error("indefinite length is not valid for major type {0}")]
    InvalidIndefinite(u8),

    #[error("break marker outside an indefinite-length item")]
    UnexpectedBreak,

    #[error("indefinite-length string contains an invalid chunk")]
    InvalidChunk,

    #[error("bignum content is not a byte string")]
    BignumNotBytes,

    #[error("cannot assign {0} into {1} target")]
    Mismatch(&'static str, &'static str),

    #[error("value {0} does not fit into target of type {1}")]
    UintOverflow(u64, &'static str),

    #[error("value {0} does not fit into target of type {1}")]
    IntOverflow(i64, &'static str),

    #[error("bignum does not fit into target of type {0}")]
    BignumOverflow(&'static str),

    #[error("array has more items than the target can hold")]
    TooManyItems,

    #[error(transparent)]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("tag handler: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Streaming CBOR decoder over `R`.
pub struct Decoder<R> {
    rin: R,

    // initial byte
    c: [u8; 1],

    // many auxiliary values fit within the next 8 bytes
    b8: [u8; 8],

    // Extra processing for tag items, keyed by tag code.
    handlers: HashMap<u64, Arc<dyn TagHandler>>,
}

impl<R: Read> Decoder<R> {
    pub fn new(rin: R) -> Self {
        Self {
            rin,
            c: [0; 1],
            b8: [0; 8],
            handlers: HashMap::new(),
        }
    }

    /// Installs `handler` for the tag code it claims, replacing any
    /// previous handler for that code. Registration must happen before
    /// decoding begins.
    pub fn register<H: TagHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.tag(), Arc::new(handler));
    }

    /// Reads exactly one data item and deposits it into `target`.
    pub fn decode(&mut self, target: &mut dyn Sink) -> Result<(), Error> {
        let c = self.read_initial()?;
        self.item(target, c)
    }

    /// Reads exactly one data item into a fresh dynamic [`Value`].
    pub fn decode_value(&mut self) -> Result<Value, Error> {
        let mut value = Value::Null;
        self.decode(&mut value)?;
        Ok(value)
    }

    fn read_initial(&mut self) -> Result<u8, Error> {
        self.rin.read_exact(&mut self.c)?;
        Ok(self.c[0])
    }

    /// Decodes the auxiliary value for the low five bits of an initial
    /// byte. `None` means indefinite length.
    fn read_aux(&mut self, info: u8) -> Result<Option<u64>, Error> {
        match info {
            0..=23 => Ok(Some(info as u64)),
            24 => {
                self.rin.read_exact(&mut self.b8[..1])?;
                Ok(Some(self.b8[0] as u64))
            }
            25 => {
                self.rin.read_exact(&mut self.b8[..2])?;
                Ok(Some(u16::from_be_bytes([self.b8[0], self.b8[1]]) as u64))
            }
            26 => {
                self.rin.read_exact(&mut self.b8[..4])?;
                Ok(Some(u32::from_be_bytes([
                    self.b8[0], self.b8[1], self.b8[2], self.b8[3],
                ]) as u64))
            }
            27 => {
                self.rin.read_exact(&mut self.b8)?;
                Ok(Some(u64::from_be_bytes(self.b8)))
            }
            31 => Ok(None),
            _ => Err(Error::ReservedInfo(info)),
        }
    }

    fn read_buf(&mut self, len: u64) -> Result<Vec<u8>, Error> {
        let len = usize::try_from(len).map_err(|_| Error::UintOverflow(len, "usize"))?;
        let mut buf = vec![0u8; len];
        self.rin.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Decodes one data item whose initial byte `c` has been read.
    fn item(&mut self, sink: &mut dyn Sink, c: u8) -> Result<(), Error> {
        let mtype = c >> 5;
        let info = c & 0x1F;
        let aux = self.read_aux(info)?;

        match mtype {
            major::UNSIGNED => {
                let aux = aux.ok_or(Error::InvalidIndefinite(mtype))?;
                sink.set_uint(aux)
            }
            major::NEGATIVE => {
                let aux = aux.ok_or(Error::InvalidIndefinite(mtype))?;
                if aux > i64::MAX as u64 {
                    sink.set_bignum(BigInt::from(-1) - BigInt::from(aux))
                } else {
                    sink.set_int(-1 - aux as i64)
                }
            }
            major::BYTES => {
                let buf = match aux {
                    Some(len) => self.read_buf(len)?,
                    None => self.byte_chunks()?,
                };
                sink.set_bytes(buf)
            }
            major::TEXT => {
                let text = match aux {
                    Some(len) => String::from_utf8(self.read_buf(len)?)?,
                    None => self.text_chunks()?,
                };
                sink.set_text(text)
            }
            major::ARRAY => self.array(sink, aux),
            major::MAP => self.map(sink, aux),
            major::TAG => {
                let tag = aux.ok_or(Error::InvalidIndefinite(mtype))?;
                self.tagged(sink, tag)
            }
            major::SIMPLE => match info {
                20 => sink.set_bool(false),
                21 => sink.set_bool(true),
                22 => sink.set_null(),
                25 => {
                    let aux = aux.ok_or(Error::InvalidIndefinite(mtype))?;
                    sink.set_f64(f64::from(half::f16::from_bits(aux as u16)))
                }
                26 => {
                    let aux = aux.ok_or(Error::InvalidIndefinite(mtype))?;
                    sink.set_f32(f32::from_bits(aux as u32))
                }
                27 => {
                    let aux = aux.ok_or(Error::InvalidIndefinite(mtype))?;
                    sink.set_f64(f64::from_bits(aux))
                }
                31 => Err(Error::UnexpectedBreak),
                // Unassigned simple values (including undefined) are
                // consumed and leave the target unmaterialized.
                _ => Ok(()),
            },
            _ => unreachable!("major type is three bits"),
        }
    }

    fn byte_chunks(&mut self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        loop {
            let c = self.read_initial()?;
            if c == BREAK {
                return Ok(out);
            }
            if c >> 5 != major::BYTES {
                return Err(Error::InvalidChunk);
            }
            // Chunks must themselves be definite-length.
            let len = self.read_aux(c & 0x1F)?.ok_or(Error::InvalidChunk)?;
            out.extend_from_slice(&self.read_buf(len)?);
        }
    }

    fn text_chunks(&mut self) -> Result<String, Error> {
        let mut out = String::new();
        loop {
            let c = self.read_initial()?;
            if c == BREAK {
                return Ok(out);
            }
            if c >> 5 != major::TEXT {
                return Err(Error::InvalidChunk);
            }
            let len = self.read_aux(c & 0x1F)?.ok_or(Error::InvalidChunk)?;
            out.push_str(&String::from_utf8(self.read_buf(len)?)?);
        }
    }

    fn array(&mut self, sink: &mut dyn Sink, aux: Option<u64>) -> Result<(), Error> {
        let len_hint = match aux {
            Some(count) => usize::try_from(count).map_err(|_| Error::UintOverflow(count, "usize"))?,
            None => 0,
        };
        let mut arr = sink.begin_array(len_hint)?;

        match aux {
            Some(count) => {
                for _ in 0..count {
                    let c = self.read_initial()?;
                    self.item(arr.element()?, c)?;
                    arr.append()?;
                }
            }
            None => loop {
                let c = self.read_initial()?;
                if c == BREAK {
                    break;
                }
                self.item(arr.element()?, c)?;
                arr.append()?;
            },
        }

        arr.end()
    }

    fn map(&mut self, sink: &mut dyn Sink, aux: Option<u64>) -> Result<(), Error> {
        let mut map = sink.begin_map()?;

        match aux {
            Some(count) => {
                for _ in 0..count {
                    let c = self.read_initial()?;
                    self.entry(&mut *map, c)?;
                }
            }
            None => loop {
                let c = self.read_initial()?;
                if c == BREAK {
                    break;
                }
                self.entry(&mut *map, c)?;
            },
        }

        map.end()
    }

    /// Decodes one key/value pair; `c` is the key's initial byte.
    fn entry(&mut self, map: &mut dyn MapSink, c: u8) -> Result<(), Error> {
        self.item(map.key()?, c)?;

        let c = self.read_initial()?;
        match map.value()? {
            Some(val) => self.item(val, c)?,
            // Keys that bind nothing still consume their value; this is
            // the forward-compatibility contract, not an error.
            None => {
                let mut discard = Value::Null;
                self.item(&mut discard, c)?;
            }
        }

        map.commit()
    }

    fn tagged(&mut self, sink: &mut dyn Sink, tag: u64) -> Result<(), Error> {
        let ic = self.read_initial()?;
        match tag {
            2 => {
                let n = self.bignum(ic)?;
                sink.set_bignum(n)
            }
            3 => {
                let n = self.bignum(ic)?;
                sink.set_bignum(BigInt::from(-1) - n)
            }
            4 | 5 => {
                if tag == 4 {
                    warn!("tag 4 (decimal fraction) is not implemented");
                } else {
                    warn!("tag 5 (bigfloat) is not implemented");
                }
                // Consume the wrapped item so the stream stays in sync;
                // the target is left unmaterialized.
                let mut discard = Value::Null;
                self.item(&mut discard, ic)
            }
            _ => match self.handlers.get(&tag).cloned() {
                Some(handler) => {
                    let mut target = handler.decode_target();
                    self.item(target.as_sink(), ic)?;
                    let value = handler.post_decode(target)?;
                    sink.set_tag(tag, value)
                }
                None => {
                    let mut content = Value::Null;
                    self.item(&mut content, ic)?;
                    sink.set_tag(
                        tag,
                        Value::Tag {
                            tag,
                            content: Box::new(content),
                        },
                    )
                }
            },
        }
    }

    /// Reads the byte-string content of a tag 2/3 item, folding the
    /// big-endian bytes into a magnitude.
    fn bignum(&mut self, c: u8) -> Result<BigInt, Error> {
        if c >> 5 != major::BYTES {
            return Err(Error::BignumNotBytes);
        }
        let len = self
            .read_aux(c & 0x1F)?
            .ok_or(Error::InvalidIndefinite(major::BYTES))?;
        let raw = self.read_buf(len)?;
        Ok(BigInt::from_bytes_be(Sign::Plus, &raw))
    }
}
