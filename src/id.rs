use std::{fmt, sync::Mutex};

use ulid::{Generator, Ulid};

/// Width in bytes of a [`RowId`].
pub const ROW_ID_WIDTH: usize = 16;

/// Fixed 16-byte opaque identity of a stored row.
///
/// The bytes are compared lexicographically, so identities produced by
/// [`RowIdGenerator`] sort in creation order.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId([u8; ROW_ID_WIDTH]);

impl RowId {
    /// The all-zero identity carried by a freshly reset row.
    pub const NIL: RowId = RowId([0; ROW_ID_WIDTH]);

    /// Wrap raw identity bytes.
    pub const fn from_bytes(bytes: [u8; ROW_ID_WIDTH]) -> Self {
        Self(bytes)
    }

    /// Build an identity from a slice, which must be exactly 16 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; ROW_ID_WIDTH] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Borrow the identity bytes.
    pub fn as_bytes(&self) -> &[u8; ROW_ID_WIDTH] {
        &self.0
    }

    /// Whether this is the all-zero identity.
    pub fn is_nil(&self) -> bool {
        self.0 == [0; ROW_ID_WIDTH]
    }
}

impl From<Ulid> for RowId {
    fn from(value: Ulid) -> Self {
        Self(value.to_bytes())
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RowId({self})")
    }
}

/// Thread-safe ULID generator handing out row identities.
pub struct RowIdGenerator {
    inner: Mutex<Generator>,
}

impl RowIdGenerator {
    /// Create a new generator seeded with the current time.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Generator::new()),
        }
    }

    /// Produce the next [`RowId`] in a monotonic, time-ordered sequence.
    pub fn generate(&self) -> RowId {
        let mut guard = self
            .inner
            .lock()
            .expect("row id generator mutex should not be poisoned");
        guard
            .generate()
            .map(RowId::from)
            .unwrap_or_else(|_| RowId::from(Ulid::new()))
    }
}

impl Default for RowIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RowIdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowIdGenerator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_ordered_and_unique() {
        let generator = RowIdGenerator::new();
        let ids: Vec<RowId> = (0..64).map(|_| generator.generate()).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn slice_conversion_requires_exact_width() {
        assert!(RowId::from_slice(&[1; 15]).is_none());
        assert!(RowId::from_slice(&[1; 17]).is_none());
        let id = RowId::from_slice(&[7; 16]).expect("16 bytes");
        assert_eq!(id.as_bytes(), &[7; 16]);
        assert!(!id.is_nil());
        assert!(RowId::NIL.is_nil());
    }

    #[test]
    fn display_is_uppercase_hex() {
        let mut bytes = [0u8; 16];
        bytes[0] = 0xAB;
        bytes[15] = 0x01;
        let id = RowId::from_bytes(bytes);
        assert_eq!(id.to_string(), "AB000000000000000000000000000001");
    }
}
