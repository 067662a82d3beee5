//! Recall - multi-tier conversational memory
//!
//! Holds short-term conversation turns, a priority-ordered working set and an
//! embedding-indexed long-term store, and assembles a bounded context block
//! from all three for each agent turn.

pub mod config;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod storage;
pub mod testing;

pub use error::RecallError;
