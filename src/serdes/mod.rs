//! Minimal binary serialization used by the container formats.
//!
//! Every multi-byte integer is written big-endian so serialized containers are
//! independent of the host's endianness.

mod boolean;
mod bytes;
mod list;
mod num;
mod option;
mod string;

use ::bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// Errors raised while decoding malformed input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer ended before a value was complete.
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes required by the value being decoded.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },
    /// A discriminant byte held a value outside its domain.
    #[error("invalid {what} tag: {tag}")]
    InvalidTag {
        /// Name of the tagged value.
        what: &'static str,
        /// Offending tag byte.
        tag: u8,
    },
    /// A string field did not hold valid UTF-8.
    #[error("string field is not valid utf-8")]
    InvalidUtf8,
}

/// Values that can be written into a byte buffer.
pub trait Encode {
    /// Append the encoded form of `self` to `buf`.
    fn encode<B: BufMut>(&self, buf: &mut B);

    /// Exact number of bytes [`Encode::encode`] appends.
    fn size(&self) -> usize;

    /// Encode into a freshly allocated, exactly sized buffer.
    fn encode_to_bytes(&self) -> ::bytes::Bytes {
        let mut buf = BytesMut::with_capacity(self.size());
        self.encode(&mut buf);
        buf.freeze()
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        Encode::encode(*self, buf)
    }

    fn size(&self) -> usize {
        Encode::size(*self)
    }
}

/// Values that can be read back from a byte buffer.
pub trait Decode: Sized {
    /// Read one value from the front of `buf`, advancing it.
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError>;
}

/// Fail with [`DecodeError::UnexpectedEof`] unless `buf` holds `needed` bytes.
pub(crate) fn ensure_remaining<B: Buf>(buf: &B, needed: usize) -> Result<(), DecodeError> {
    if buf.remaining() < needed {
        return Err(DecodeError::UnexpectedEof {
            needed,
            remaining: buf.remaining(),
        });
    }
    Ok(())
}
