use std::mem::size_of;

use bytes::{Buf, BufMut, Bytes};

use super::{ensure_remaining, Decode, DecodeError, Encode};

impl Encode for [u8] {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        (self.len() as u32).encode(buf);
        buf.put_slice(self);
    }

    fn size(&self) -> usize {
        size_of::<u32>() + self.len()
    }
}

impl Encode for Bytes {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        self.as_ref().encode(buf)
    }

    fn size(&self) -> usize {
        self.as_ref().size()
    }
}

impl Decode for Bytes {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        let len = u32::decode(buf)? as usize;
        ensure_remaining(buf, len)?;

        Ok(buf.copy_to_bytes(len))
    }
}
