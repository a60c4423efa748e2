use bytes::{Buf, BufMut};

use super::{ensure_remaining, Decode, DecodeError, Encode};

impl Encode for bool {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(u8::from(*self));
    }

    fn size(&self) -> usize {
        1
    }
}

impl Decode for bool {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        ensure_remaining(buf, 1)?;
        match buf.get_u8() {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(DecodeError::InvalidTag {
                what: "boolean",
                tag,
            }),
        }
    }
}
