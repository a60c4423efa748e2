//! Key ranges over encoded index entries.

use std::ops::Bound;

use crate::query::QueryType;

/// A range of encoded keys with owned bounds, so a cursor can keep it across
/// calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct KeyRange {
    /// Start bound (inclusive/exclusive/unbounded).
    pub(crate) start: Bound<Vec<u8>>,
    /// End bound (inclusive/exclusive/unbounded).
    pub(crate) end: Bound<Vec<u8>>,
}

impl KeyRange {
    /// Every key.
    pub(crate) fn all() -> Self {
        Self {
            start: Bound::Unbounded,
            end: Bound::Unbounded,
        }
    }

    pub(crate) fn new(start: Bound<Vec<u8>>, end: Bound<Vec<u8>>) -> Self {
        Self { start, end }
    }

    /// Keys selected by positioning `query_type` at encoded `prefix`.
    pub(crate) fn for_query(query_type: QueryType, prefix: Vec<u8>) -> Self {
        let after_prefix = || match prefix_successor(&prefix) {
            Some(successor) => Bound::Excluded(successor),
            None => Bound::Unbounded,
        };
        match query_type {
            QueryType::IndexFirst | QueryType::IndexLast => Self::all(),
            QueryType::ExactKey => Self::new(Bound::Included(prefix.clone()), after_prefix()),
            QueryType::KeyOrNext => Self::new(Bound::Included(prefix), Bound::Unbounded),
            QueryType::AfterKey => {
                let start = match after_prefix() {
                    Bound::Excluded(successor) => Bound::Included(successor),
                    _ => return Self::new(Bound::Excluded(prefix), Bound::Excluded(Vec::new())),
                };
                Self::new(start, Bound::Unbounded)
            }
            QueryType::KeyOrPrevious => Self::new(Bound::Unbounded, after_prefix()),
            QueryType::BeforeKey => Self::new(Bound::Unbounded, Bound::Excluded(prefix)),
        }
    }

    /// Borrowed start bound, for seeking.
    pub(crate) fn start_bound(&self) -> Bound<&Vec<u8>> {
        self.start.as_ref()
    }

    /// Borrowed end bound, for seeking.
    pub(crate) fn end_bound(&self) -> Bound<&Vec<u8>> {
        self.end.as_ref()
    }

    /// Whether this range contains `key`.
    pub(crate) fn contains(&self, key: &[u8]) -> bool {
        let start_ok = match &self.start {
            Bound::Unbounded => true,
            Bound::Included(bound) => key >= bound.as_slice(),
            Bound::Excluded(bound) => key > bound.as_slice(),
        };
        if !start_ok {
            return false;
        }
        match &self.end {
            Bound::Unbounded => true,
            Bound::Included(bound) => key <= bound.as_slice(),
            Bound::Excluded(bound) => key < bound.as_slice(),
        }
    }
}

/// Smallest key greater than every key starting with `prefix`, or `None`
/// when no such key exists.
pub(crate) fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut successor = prefix.to_vec();
    while let Some(last) = successor.pop() {
        if last != 0xFF {
            successor.push(last + 1);
            return Some(successor);
        }
    }
    None
}
