//! Memory tiers and the orchestrator that ties them together
//!
//! - [`ConversationBuffer`]: bounded recency window (short-term)
//! - [`WorkingMemory`]: priority-ordered active tasks
//! - [`VectorMemory`]: embedding-indexed long-term store
//! - [`MemoryStore`]: consolidation and context assembly across all three

pub mod buffer;
pub mod long_term;
pub mod store;
pub mod types;
pub mod working;

pub use buffer::{ConversationBuffer, DEFAULT_SHORT_TERM_MAX};
pub use long_term::VectorMemory;
pub use store::{ConsolidationReport, MemoryStore};
pub use types::{
    MemoryEntry, MemorySearchResult, MemoryStats, MemoryTier, Metadata, PRIORITY_KEY, TAGS_KEY,
    generate_id,
};
pub use working::{DEFAULT_WORKING_MAX, WorkingMemory};
