//! Working memory: the active-task set
//!
//! Items live in a binary max-heap keyed by priority. Reads return a strictly
//! sorted view (highest priority first, insertion order among equals) rather
//! than the heap's internal layout.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::memory::types::MemoryEntry;

/// Target size used when working memory is configured with zero
pub const DEFAULT_WORKING_MAX: usize = 10;

#[derive(Debug)]
struct WorkingItem {
    priority: i64,
    seq: u64,
    entry: MemoryEntry,
}

impl PartialEq for WorkingItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for WorkingItem {}

impl PartialOrd for WorkingItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WorkingItem {
    // Greater = served first: higher priority, then lower sequence number.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority-ordered set of active-task entries
#[derive(Debug)]
pub struct WorkingMemory {
    items: BinaryHeap<WorkingItem>,
    max_size: usize,
    enforce_max: bool,
    next_seq: u64,
}

impl WorkingMemory {
    /// Create a working set whose target size is `max_size`
    ///
    /// The target is not enforced; see [`WorkingMemory::enforcing`].
    pub fn new(max_size: usize) -> Self {
        let max_size = if max_size == 0 {
            DEFAULT_WORKING_MAX
        } else {
            max_size
        };
        Self {
            items: BinaryHeap::with_capacity(max_size),
            max_size,
            enforce_max: false,
            next_seq: 0,
        }
    }

    /// Create a working set that drops its lowest-priority item once
    /// `max_size` is exceeded
    pub fn enforcing(max_size: usize) -> Self {
        Self {
            enforce_max: true,
            ..Self::new(max_size)
        }
    }

    /// Insert an entry, keyed by the `priority` in its metadata
    ///
    /// Returns the displaced entry when the size limit is enforced and was
    /// exceeded.
    pub fn add(&mut self, entry: MemoryEntry) -> Option<MemoryEntry> {
        let item = WorkingItem {
            priority: entry.priority(),
            seq: self.next_seq,
            entry,
        };
        self.next_seq += 1;
        self.items.push(item);

        if self.enforce_max && self.items.len() > self.max_size {
            return self.evict_lowest();
        }
        None
    }

    /// All entries, highest priority first
    pub fn get_all(&self) -> Vec<MemoryEntry> {
        let mut items: Vec<&WorkingItem> = self.items.iter().collect();
        items.sort_by(|a, b| b.cmp(a));
        items.into_iter().map(|item| item.entry.clone()).collect()
    }

    /// Highest-priority entry, if any
    pub fn peek(&self) -> Option<&MemoryEntry> {
        self.items.peek().map(|item| &item.entry)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Whether the set currently holds more than its target size
    pub fn is_over_target(&self) -> bool {
        self.items.len() > self.max_size
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    // O(n) rebuild; the working set is small.
    fn evict_lowest(&mut self) -> Option<MemoryEntry> {
        let mut items = std::mem::take(&mut self.items).into_vec();
        let lowest = items
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.priority
                    .cmp(&b.priority)
                    .then_with(|| a.seq.cmp(&b.seq))
            })
            .map(|(idx, _)| idx)?;
        let evicted = items.swap_remove(lowest);
        self.items = BinaryHeap::from(items);
        Some(evicted.entry)
    }
}

impl Default for WorkingMemory {
    fn default() -> Self {
        Self::new(DEFAULT_WORKING_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::{Metadata, MemoryTier, PRIORITY_KEY};
    use serde_json::json;

    fn task(content: &str, priority: i64) -> MemoryEntry {
        let mut metadata = Metadata::new();
        metadata.insert(PRIORITY_KEY.to_string(), json!(priority));
        MemoryEntry::new(MemoryTier::Working, content, metadata)
    }

    fn contents(entries: &[MemoryEntry]) -> Vec<String> {
        entries.iter().map(|e| e.content.clone()).collect()
    }

    #[test]
    fn test_get_all_sorted_by_priority() {
        let mut working = WorkingMemory::new(10);
        working.add(task("low", 1));
        working.add(task("high", 9));
        working.add(task("mid", 5));
        working.add(task("urgent", 10));
        working.add(task("none", 0));

        assert_eq!(
            contents(&working.get_all()),
            vec!["urgent", "high", "mid", "low", "none"]
        );
    }

    #[test]
    fn test_equal_priority_keeps_insertion_order() {
        let mut working = WorkingMemory::new(10);
        working.add(task("first", 3));
        working.add(task("second", 3));
        working.add(task("third", 3));

        assert_eq!(
            contents(&working.get_all()),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn test_missing_priority_defaults_to_zero() {
        let mut working = WorkingMemory::new(10);
        working.add(MemoryEntry::new(MemoryTier::Working, "plain", Metadata::new()));
        working.add(task("negative", -1));
        working.add(task("positive", 1));

        assert_eq!(
            contents(&working.get_all()),
            vec!["positive", "plain", "negative"]
        );
    }

    #[test]
    fn test_target_not_enforced_by_default() {
        let mut working = WorkingMemory::new(2);
        for i in 0..5 {
            assert!(working.add(task(&format!("t{i}"), i)).is_none());
        }
        assert_eq!(working.len(), 5);
        assert!(working.is_over_target());
    }

    #[test]
    fn test_enforcing_drops_lowest_priority() {
        let mut working = WorkingMemory::enforcing(2);
        working.add(task("keep-high", 8));
        working.add(task("drop-low", 1));

        let evicted = working.add(task("keep-mid", 4)).expect("should evict");
        assert_eq!(evicted.content, "drop-low");
        assert_eq!(working.len(), 2);
        assert!(!working.is_over_target());
        assert_eq!(contents(&working.get_all()), vec!["keep-high", "keep-mid"]);
    }

    #[test]
    fn test_enforcing_drops_oldest_among_lowest() {
        let mut working = WorkingMemory::enforcing(2);
        working.add(task("older", 1));
        working.add(task("newer", 1));

        let evicted = working.add(task("top", 5)).unwrap();
        assert_eq!(evicted.content, "older");
    }

    #[test]
    fn test_peek_and_clear() {
        let mut working = WorkingMemory::default();
        assert!(working.peek().is_none());

        working.add(task("a", 2));
        working.add(task("b", 7));
        assert_eq!(working.peek().map(|e| e.content.as_str()), Some("b"));

        working.clear();
        assert!(working.is_empty());
        assert_eq!(working.len(), 0);
    }

    #[test]
    fn test_zero_max_uses_default() {
        let working = WorkingMemory::new(0);
        assert_eq!(working.max_size(), DEFAULT_WORKING_MAX);
    }
}
