pub mod index;

pub use index::{DEFAULT_LIST_LIMIT, DEFAULT_SEARCH_LIMIT, VectorEntry, VectorIndex, VectorMetadata};
