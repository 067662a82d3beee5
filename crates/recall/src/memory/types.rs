//! Memory types for the Recall system
//!
//! Defines the entry that moves between tiers, the tier tag itself and the
//! read-only projections handed back to callers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Open key/value bag attached to an entry (priority, session id, tags, ...)
pub type Metadata = HashMap<String, Value>;

/// Metadata key read by the working tier
pub const PRIORITY_KEY: &str = "priority";

/// Metadata key mapped onto the persisted tag set
pub const TAGS_KEY: &str = "tags";

/// Which tier currently owns an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTier {
    /// Recent conversation turns
    ShortTerm,
    /// Embedding-indexed store
    LongTerm,
    /// Active tasks ordered by priority
    Working,
}

impl MemoryTier {
    /// Identifier prefix for entries created in this tier
    pub fn id_prefix(&self) -> &'static str {
        match self {
            MemoryTier::ShortTerm => "st",
            MemoryTier::LongTerm => "lt",
            MemoryTier::Working => "wm",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryTier::ShortTerm => "short_term",
            MemoryTier::LongTerm => "long_term",
            MemoryTier::Working => "working",
        }
    }
}

/// Generate a fresh, time-ordered identifier for an entry in `tier`
pub fn generate_id(tier: MemoryTier) -> String {
    format!("{}_{}", tier.id_prefix(), Uuid::now_v7().simple())
}

/// A single memory unit, owned by exactly one tier at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique, time-derived identifier
    pub id: String,
    /// Tier that currently holds the entry
    pub tier: MemoryTier,
    /// Free-text content
    pub content: String,
    /// When the entry was created
    pub created_at: DateTime<Utc>,
    /// Open metadata bag
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: Metadata,
    /// Embedding computed for this content, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl MemoryEntry {
    /// Create a new entry for `tier` with a fresh id and the current time
    pub fn new(tier: MemoryTier, content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: generate_id(tier),
            tier,
            content: content.into(),
            created_at: Utc::now(),
            metadata,
            embedding: None,
        }
    }

    /// Override the creation timestamp (history import, backdating)
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Attach a precomputed embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Priority stored in the metadata bag, 0 when absent or not an integer
    pub fn priority(&self) -> i64 {
        self.metadata
            .get(PRIORITY_KEY)
            .and_then(Value::as_i64)
            .unwrap_or(0)
    }

    /// Time elapsed since creation
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.created_at
    }

    /// Tier-transition bookkeeping; the only mutation an entry sees
    pub(crate) fn move_to(mut self, tier: MemoryTier) -> Self {
        self.tier = tier;
        self
    }
}

/// A long-term match returned by search
#[derive(Debug, Clone, Serialize)]
pub struct MemorySearchResult {
    /// The matched entry
    pub entry: MemoryEntry,
    /// Cosine similarity between query and entry vector, in [-1, 1]
    pub score: f32,
}

/// Per-tier entry counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub short_term_count: usize,
    pub long_term_count: usize,
    pub working_count: usize,
}

impl MemoryStats {
    pub fn total(&self) -> usize {
        self.short_term_count + self.long_term_count + self.working_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_new_defaults() {
        let entry = MemoryEntry::new(MemoryTier::ShortTerm, "hello", Metadata::new());

        assert!(entry.id.starts_with("st_"));
        assert_eq!(entry.tier, MemoryTier::ShortTerm);
        assert_eq!(entry.content, "hello");
        assert!(entry.metadata.is_empty());
        assert!(entry.embedding.is_none());
        assert!(entry.created_at <= Utc::now());
    }

    #[test]
    fn test_ids_are_unique_and_prefixed() {
        let a = generate_id(MemoryTier::Working);
        let b = generate_id(MemoryTier::Working);
        assert_ne!(a, b);
        assert!(a.starts_with("wm_"));
        assert!(generate_id(MemoryTier::LongTerm).starts_with("lt_"));
    }

    #[test]
    fn test_ids_are_time_ordered() {
        let first = generate_id(MemoryTier::ShortTerm);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = generate_id(MemoryTier::ShortTerm);
        assert!(first < second, "{first} should sort before {second}");
    }

    #[test]
    fn test_priority_from_metadata() {
        let mut metadata = Metadata::new();
        metadata.insert(PRIORITY_KEY.to_string(), json!(7));
        let entry = MemoryEntry::new(MemoryTier::Working, "task", metadata);
        assert_eq!(entry.priority(), 7);
    }

    #[test]
    fn test_priority_defaults_to_zero() {
        let entry = MemoryEntry::new(MemoryTier::Working, "task", Metadata::new());
        assert_eq!(entry.priority(), 0);

        let mut metadata = Metadata::new();
        metadata.insert(PRIORITY_KEY.to_string(), json!("high"));
        let entry = MemoryEntry::new(MemoryTier::Working, "task", metadata);
        assert_eq!(entry.priority(), 0);
    }

    #[test]
    fn test_entry_serialization() {
        let mut metadata = Metadata::new();
        metadata.insert("session".to_string(), json!("abc"));
        let entry = MemoryEntry::new(MemoryTier::LongTerm, "fact", metadata)
            .with_embedding(vec![0.1, 0.2]);

        let json = serde_json::to_string(&entry).expect("Failed to serialize entry");
        assert!(json.contains("\"tier\":\"long_term\""));

        let deserialized: MemoryEntry =
            serde_json::from_str(&json).expect("Failed to deserialize entry");
        assert_eq!(entry, deserialized);
    }

    #[test]
    fn test_move_to_keeps_identity() {
        let entry = MemoryEntry::new(MemoryTier::ShortTerm, "moving", Metadata::new());
        let id = entry.id.clone();
        let moved = entry.move_to(MemoryTier::LongTerm);
        assert_eq!(moved.id, id);
        assert_eq!(moved.tier, MemoryTier::LongTerm);
    }

    #[test]
    fn test_stats_total() {
        let stats = MemoryStats {
            short_term_count: 3,
            long_term_count: 4,
            working_count: 1,
        };
        assert_eq!(stats.total(), 8);
    }
}
