use std::mem::size_of;

use bytes::{Buf, BufMut};

use super::{ensure_remaining, Decode, DecodeError, Encode};

macro_rules! implement_encode_decode {
    ($ty:ident, $put:ident, $get:ident) => {
        impl Encode for $ty {
            fn encode<B: BufMut>(&self, buf: &mut B) {
                buf.$put(*self);
            }

            fn size(&self) -> usize {
                size_of::<Self>()
            }
        }

        impl Decode for $ty {
            fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
                ensure_remaining(buf, size_of::<Self>())?;
                Ok(buf.$get())
            }
        }
    };
}

implement_encode_decode!(u8, put_u8, get_u8);
implement_encode_decode!(u16, put_u16, get_u16);
implement_encode_decode!(u32, put_u32, get_u32);
implement_encode_decode!(u64, put_u64, get_u64);
implement_encode_decode!(i32, put_i32, get_i32);
implement_encode_decode!(i64, put_i64, get_i64);

#[cfg(test)]
mod tests {
    use crate::serdes::{Decode, Encode};

    #[test]
    fn integers_are_big_endian() {
        let bytes = 0x0102_0304u32.encode_to_bytes();
        assert_eq!(&bytes[..], &[1, 2, 3, 4]);

        let bytes = (-2i64).encode_to_bytes();
        assert_eq!(&bytes[..], &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE]);
        assert_eq!(i64::decode(&mut &bytes[..]).unwrap(), -2);
    }
}
