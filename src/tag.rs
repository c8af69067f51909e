/*!
Extra processing for CBOR tag items.

Handlers are registered on a [`Decoder`](crate::decode::Decoder) before
decoding begins:

```ignore
let mut dec = Decoder::new(input);
dec.register(EpochSeconds);
```

Tags 2 and 3 (bignums) are decoded natively and never reach a handler.
*/

use crate::decode::Error;
use crate::sink::Sink;
use crate::value::Value;
use std::any::Any;

/// A decode target produced by a [`TagHandler`], with a downcast path
/// for the handler's post-decode step.
///
/// Implemented for every `Sink + Any` type.
pub trait TagTarget: Sink {
    fn as_sink(&mut self) -> &mut dyn Sink;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Sink + Any> TagTarget for T {
    fn as_sink(&mut self) -> &mut dyn Sink {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Custom post-processing for one tag code.
pub trait TagHandler {
    /// The tag code this handler claims.
    fn tag(&self) -> u64;

    /// A fresh target the wrapped item will be decoded into.
    fn decode_target(&self) -> Box<dyn TagTarget>;

    /// Runs after the wrapped item has been decoded into `target`. The
    /// returned value replaces the raw decoded item; an error aborts the
    /// decode.
    fn post_decode(&self, target: Box<dyn TagTarget>) -> Result<Value, Error>;
}
