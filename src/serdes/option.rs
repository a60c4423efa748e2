use bytes::{Buf, BufMut};

use super::{ensure_remaining, Decode, DecodeError, Encode};

impl<V> Encode for Option<V>
where
    V: Encode,
{
    fn encode<B: BufMut>(&self, buf: &mut B) {
        match self {
            None => buf.put_u8(0),
            Some(v) => {
                buf.put_u8(1);
                v.encode(buf);
            }
        }
    }

    fn size(&self) -> usize {
        match self {
            None => 1,
            Some(v) => 1 + v.size(),
        }
    }
}

impl<V> Decode for Option<V>
where
    V: Decode,
{
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        ensure_remaining(buf, 1)?;
        match buf.get_u8() {
            0 => Ok(None),
            1 => Ok(Some(V::decode(buf)?)),
            tag => Err(DecodeError::InvalidTag { what: "option", tag }),
        }
    }
}
