//! Conversation buffer for short-term memory
//!
//! Keeps the most recent N entries in insertion order. Backed by an LRU
//! cache used purely as an ordered map: entries are only ever pushed and
//! peeked, never promoted on read, so "least recently used" is always
//! "oldest inserted". That gives O(1) insert, O(1) eviction of the oldest
//! entry and O(1) removal by identifier.

use std::num::NonZeroUsize;

use chrono::{Duration, Utc};
use lru::LruCache;

use crate::memory::types::MemoryEntry;

/// Capacity used when a buffer is configured with zero
pub const DEFAULT_SHORT_TERM_MAX: usize = 50;

const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(DEFAULT_SHORT_TERM_MAX).unwrap();

/// Bounded recency window of short-term entries
#[derive(Debug)]
pub struct ConversationBuffer {
    entries: LruCache<String, MemoryEntry>,
}

impl ConversationBuffer {
    /// Create a buffer holding at most `max_size` entries
    pub fn new(max_size: usize) -> Self {
        let cap = NonZeroUsize::new(max_size).unwrap_or(DEFAULT_CAPACITY);
        Self {
            entries: LruCache::new(cap),
        }
    }

    /// Append an entry at the tail
    ///
    /// When the buffer is full the oldest entry is evicted and returned.
    pub fn add(&mut self, entry: MemoryEntry) -> Option<MemoryEntry> {
        let id = entry.id.clone();
        match self.entries.push(id.clone(), entry) {
            // `push` also hands back the previous value when the key was
            // already present; that is a replacement, not an eviction.
            Some((evicted_id, _)) if evicted_id == id => None,
            Some((_, evicted)) => Some(evicted),
            None => None,
        }
    }

    /// Up to `count` entries, most recent first
    pub fn get_recent(&self, count: usize) -> Vec<MemoryEntry> {
        self.entries
            .iter()
            .take(count)
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    /// Look up an entry without changing its position
    pub fn get(&self, id: &str) -> Option<&MemoryEntry> {
        self.entries.peek(id)
    }

    /// Remove an entry by identifier; no-op when absent
    pub fn remove(&mut self, id: &str) -> Option<MemoryEntry> {
        self.entries.pop(id)
    }

    /// Entries created more than `age` ago, oldest first
    pub fn entries_older_than(&self, age: Duration) -> Vec<MemoryEntry> {
        let now = Utc::now();
        self.entries
            .iter()
            .rev()
            .filter(|(_, entry)| now - entry.created_at > age)
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries held
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

impl Default for ConversationBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_SHORT_TERM_MAX)
    }
}
