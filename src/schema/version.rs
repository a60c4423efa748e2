//! Version tags written at the front of versioned containers.
//!
//! A tag is the version zig-zag encoded into one byte (`version << 1`), so
//! well-formed tags are the even bytes `0x00..=0x7E`.

use bytes::Buf;

use super::ContainerError;
use crate::{
    logging::bridge_log,
    serdes::{ensure_remaining, DecodeError},
};

/// Largest well-formed version tag.
pub const MAX_ENCODED_VERSION: u8 = 0x7E;

/// Version of serialized table schemas written by this build.
pub const TABLE_SCHEMA_VERSION: u8 = 0;

/// Version of serialized rows written by this build.
pub const ROW_VERSION: u8 = 0;

/// Tag byte for `version`.
pub const fn encode_version(version: u8) -> u8 {
    version << 1
}

/// Version carried by a tag byte.
pub fn decode_version(tag: u8) -> Result<u8, ContainerError> {
    if tag > MAX_ENCODED_VERSION || tag % 2 != 0 {
        return Err(DecodeError::InvalidTag {
            what: "version",
            tag,
        }
        .into());
    }
    Ok(tag >> 1)
}

/// Consume the version tag of a `container` and require `supported`.
pub(crate) fn expect_version<B: Buf>(
    buf: &mut B,
    container: &'static str,
    supported: u8,
) -> Result<(), ContainerError> {
    ensure_remaining(buf, 1)?;
    let found = decode_version(buf.get_u8())?;
    if found != supported {
        bridge_log!(
            log::Level::Warn,
            "unknown_version",
            "container={} found={} supported={}",
            container,
            found,
            supported
        );
        return Err(ContainerError::UnknownVersion {
            container,
            found,
            supported,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_even_bytes() {
        assert_eq!(encode_version(0), 0);
        assert_eq!(encode_version(63), 0x7E);
        assert_eq!(decode_version(0x7E).unwrap(), 63);
        assert!(matches!(
            decode_version(0x01),
            Err(ContainerError::Decode(DecodeError::InvalidTag { .. }))
        ));
        assert!(decode_version(0x80).is_err());
    }

    #[test]
    fn newer_version_is_reported_separately() {
        let mut buf = &[encode_version(3), 0xAA][..];
        assert_eq!(
            expect_version(&mut buf, "row", ROW_VERSION).unwrap_err(),
            ContainerError::UnknownVersion {
                container: "row",
                found: 3,
                supported: 0
            }
        );
    }
}
