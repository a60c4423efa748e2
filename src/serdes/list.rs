use std::{collections::BTreeMap, mem::size_of};

use bytes::{Buf, BufMut};

use super::{Decode, DecodeError, Encode};

impl<T> Encode for Vec<T>
where
    T: Encode,
{
    fn encode<B: BufMut>(&self, buf: &mut B) {
        (self.len() as u32).encode(buf);
        for item in self {
            item.encode(buf);
        }
    }

    fn size(&self) -> usize {
        size_of::<u32>() + self.iter().map(Encode::size).sum::<usize>()
    }
}

impl<T> Decode for Vec<T>
where
    T: Decode,
{
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        let len = u32::decode(buf)? as usize;
        // Every item occupies at least one byte, which bounds the allocation
        // by the input size even when the count is corrupt.
        let mut items = Vec::with_capacity(len.min(buf.remaining()));
        for _ in 0..len {
            items.push(T::decode(buf)?);
        }
        Ok(items)
    }
}

impl<K, V> Encode for BTreeMap<K, V>
where
    K: Encode,
    V: Encode,
{
    fn encode<B: BufMut>(&self, buf: &mut B) {
        (self.len() as u32).encode(buf);
        for (key, value) in self {
            key.encode(buf);
            value.encode(buf);
        }
    }

    fn size(&self) -> usize {
        size_of::<u32>()
            + self
                .iter()
                .map(|(key, value)| key.size() + value.size())
                .sum::<usize>()
    }
}

impl<K, V> Decode for BTreeMap<K, V>
where
    K: Decode + Ord,
    V: Decode,
{
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, DecodeError> {
        let len = u32::decode(buf)? as usize;
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let key = K::decode(buf)?;
            let value = V::decode(buf)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use bytes::Bytes;

    use crate::serdes::{Decode, Encode};

    #[test]
    fn list_of_nullable_values() {
        let source = vec![
            Some(Bytes::from_static(b"a")),
            None,
            Some(Bytes::new()),
        ];
        let encoded = source.encode_to_bytes();
        assert_eq!(encoded.len(), source.size());
        assert_eq!(Vec::<Option<Bytes>>::decode(&mut &encoded[..]).unwrap(), source);
    }

    #[test]
    fn map_keeps_entries() {
        let mut source = BTreeMap::new();
        source.insert("b".to_string(), Some(Bytes::from_static(b"2")));
        source.insert("a".to_string(), None);

        let encoded = source.encode_to_bytes();
        let decoded = BTreeMap::<String, Option<Bytes>>::decode(&mut &encoded[..]).unwrap();
        assert_eq!(decoded, source);
    }
}
