//! Index predicates sent to the backend when an index scan starts.

mod error;
mod key;

pub use error::QueryKeyError;
pub use key::{QueryKey, QueryKeyBuilder, QueryType};
