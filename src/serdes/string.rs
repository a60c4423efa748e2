use std::mem::size_of;

use bytes::{Buf, BufMut};

use super::{ensure_remaining, Decode, DecodeError, Encode};

impl Encode for str {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        (self.len() as u32).encode(buf);
        buf.put_slice(self.as_bytes());
    }

    fn size(&self) -> usize {
        size_of::<u32>() + self.len()
    }
}

impl Encode for String {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        self.as_str().encode(buf)
    }

    fn size(&self) -> usize {
        self.as_str().size()
    }
}

impl Decode for String {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        let len = u32::decode(buf)? as usize;
        ensure_remaining(buf, len)?;
        let mut bytes = vec![0u8; len];
        buf.copy_to_slice(&mut bytes);

        String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use crate::serdes::{Decode, DecodeError, Encode};

    #[test]
    fn test_encode_decode() {
        let source_0 = "Hello! World";
        let source_1 = "Hello! Rows".to_string();

        let mut bytes = BytesMut::new();
        source_0.encode(&mut bytes);
        source_1.encode(&mut bytes);

        let mut reader = &bytes[..];
        let decoded_0 = String::decode(&mut reader).unwrap();
        let decoded_1 = String::decode(&mut reader).unwrap();

        assert_eq!(source_0, decoded_0);
        assert_eq!(source_1, decoded_1);
        assert!(reader.is_empty());
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let bytes = [0u8, 0, 0, 2, 0xC3, 0x28];
        assert_eq!(
            String::decode(&mut &bytes[..]).unwrap_err(),
            DecodeError::InvalidUtf8
        );
    }
}
