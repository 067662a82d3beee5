//! Long-term tier: memory entries in the vector index
//!
//! Converts between [`MemoryEntry`] and the persisted [`VectorEntry`]. A
//! `tags` string array in the metadata bag becomes the tag set; every other
//! key is stored as a custom string (strings verbatim, other values as
//! compact JSON) and comes back as a JSON string.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Result;
use crate::memory::types::{MemoryEntry, MemorySearchResult, MemoryTier, Metadata, TAGS_KEY};
use crate::storage::{VectorEntry, VectorIndex, VectorMetadata};

#[derive(Debug, Default)]
pub struct VectorMemory {
    index: VectorIndex,
}

impl VectorMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `entry` under its own identifier
    ///
    /// `vector` wins over any embedding already carried by the entry; with
    /// neither, the entry is kept but never matched by search.
    pub fn add(&mut self, entry: MemoryEntry, vector: Option<Vec<f32>>) -> String {
        let entry = entry.move_to(MemoryTier::LongTerm);
        let vector = vector.or(entry.embedding.clone()).unwrap_or_default();
        self.index.add(vector, to_vector_metadata(&entry))
    }

    pub fn search(&self, query: &[f32], limit: usize) -> Vec<MemorySearchResult> {
        self.index
            .search(query, limit)
            .into_iter()
            .map(|(entry, score)| MemorySearchResult {
                entry: from_vector_entry(entry),
                score,
            })
            .collect()
    }

    pub fn get(&self, id: &str) -> Result<MemoryEntry> {
        self.index.get(id).cloned().map(from_vector_entry)
    }

    pub fn delete(&mut self, id: &str) -> Result<MemoryEntry> {
        self.index.delete(id).map(from_vector_entry)
    }

    pub fn list(&self, limit: usize, offset: usize) -> Vec<MemoryEntry> {
        self.index
            .list(limit, offset)
            .into_iter()
            .map(from_vector_entry)
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.get(id).is_ok()
    }

    pub fn count(&self) -> usize {
        self.index.count()
    }

    pub fn clear(&mut self) {
        self.index.clear();
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.index.save(path)
    }

    pub fn load(&mut self, path: &Path) -> Result<usize> {
        self.index.load(path)
    }

    pub fn to_json(&self) -> Result<String> {
        self.index.to_json()
    }

    pub fn replace_from_json(&mut self, json: &str) -> Result<usize> {
        self.index.replace_from_json(json)
    }
}

fn to_vector_metadata(entry: &MemoryEntry) -> VectorMetadata {
    let mut tags = Vec::new();
    let mut custom = HashMap::new();

    for (key, value) in &entry.metadata {
        match (key.as_str(), value) {
            (TAGS_KEY, Value::Array(items)) if items.iter().all(Value::is_string) => {
                tags.extend(items.iter().filter_map(Value::as_str).map(str::to_string));
            }
            (_, Value::String(s)) => {
                custom.insert(key.clone(), s.clone());
            }
            (_, other) => {
                custom.insert(key.clone(), other.to_string());
            }
        }
    }

    VectorMetadata {
        id: entry.id.clone(),
        content: entry.content.clone(),
        timestamp: entry.created_at.timestamp(),
        tags,
        custom,
    }
}

fn from_vector_entry(entry: VectorEntry) -> MemoryEntry {
    let VectorEntry { vector, metadata } = entry;

    let mut bag: Metadata = metadata
        .custom
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    if !metadata.tags.is_empty() {
        bag.insert(
            TAGS_KEY.to_string(),
            Value::Array(metadata.tags.into_iter().map(Value::String).collect()),
        );
    }

    MemoryEntry {
        id: metadata.id,
        tier: MemoryTier::LongTerm,
        content: metadata.content,
        created_at: DateTime::<Utc>::from_timestamp(metadata.timestamp, 0).unwrap_or_default(),
        metadata: bag,
        embedding: (!vector.is_empty()).then_some(vector),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn long_term(content: &str, metadata: Metadata) -> MemoryEntry {
        MemoryEntry::new(MemoryTier::LongTerm, content, metadata)
    }

    #[test]
    fn test_add_and_get() {
        let mut memory = VectorMemory::new();
        let entry = long_term("fact", Metadata::new());
        let id = memory.add(entry.clone(), Some(vec![1.0, 0.0]));

        assert_eq!(id, entry.id);
        let stored = memory.get(&id).unwrap();
        assert_eq!(stored.content, "fact");
        assert_eq!(stored.tier, MemoryTier::LongTerm);
        assert_eq!(stored.embedding, Some(vec![1.0, 0.0]));
        assert_eq!(stored.created_at.timestamp(), entry.created_at.timestamp());
    }

    #[test]
    fn test_add_uses_entry_embedding_when_no_vector_given() {
        let mut memory = VectorMemory::new();
        let entry = long_term("carried", Metadata::new()).with_embedding(vec![0.0, 1.0]);
        let id = memory.add(entry, None);
        assert_eq!(memory.get(&id).unwrap().embedding, Some(vec![0.0, 1.0]));
    }

    #[test]
    fn test_entry_without_vector_is_not_searchable() {
        let mut memory = VectorMemory::new();
        let id = memory.add(long_term("bare", Metadata::new()), None);
        assert!(memory.contains(&id));
        assert!(memory.get(&id).unwrap().embedding.is_none());
        assert!(memory.search(&[1.0], 10).is_empty());
    }

    #[test]
    fn test_add_moves_entry_into_long_term() {
        let mut memory = VectorMemory::new();
        let entry = MemoryEntry::new(MemoryTier::ShortTerm, "promoted", Metadata::new());
        let id = memory.add(entry, Some(vec![1.0]));
        assert_eq!(memory.get(&id).unwrap().tier, MemoryTier::LongTerm);
        assert!(id.starts_with("st_"));
    }

    #[test]
    fn test_metadata_mapping() {
        let mut metadata = Metadata::new();
        metadata.insert(TAGS_KEY.to_string(), json!(["work", "urgent"]));
        metadata.insert("session".to_string(), json!("abc"));
        metadata.insert("turn".to_string(), json!(3));

        let mut memory = VectorMemory::new();
        let id = memory.add(long_term("tagged", metadata), Some(vec![1.0]));
        let stored = memory.get(&id).unwrap();

        assert_eq!(stored.metadata[TAGS_KEY], json!(["work", "urgent"]));
        assert_eq!(stored.metadata["session"], json!("abc"));
        assert_eq!(stored.metadata["turn"], json!("3"));
    }

    #[test]
    fn test_non_string_tags_kept_as_custom() {
        let mut metadata = Metadata::new();
        metadata.insert(TAGS_KEY.to_string(), json!([1, 2]));

        let mut memory = VectorMemory::new();
        let id = memory.add(long_term("odd tags", metadata), None);
        assert_eq!(memory.get(&id).unwrap().metadata[TAGS_KEY], json!("[1,2]"));
    }

    #[test]
    fn test_search_projects_results() {
        let mut memory = VectorMemory::new();
        let first = memory.add(long_term("first", Metadata::new()), Some(vec![1.0, 0.0, 0.0]));
        memory.add(long_term("second", Metadata::new()), Some(vec![0.0, 1.0, 0.0]));

        let results = memory.search(&[1.0, 0.0, 0.0], 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entry.id, first);
        assert_eq!(results[0].score, 1.0);
    }

    #[test]
    fn test_delete_and_list() {
        let mut memory = VectorMemory::new();
        let a = memory.add(long_term("a", Metadata::new()), Some(vec![1.0]));
        memory.add(long_term("b", Metadata::new()), Some(vec![1.0]));

        assert_eq!(memory.delete(&a).unwrap().content, "a");
        assert!(memory.delete(&a).is_err());
        assert_eq!(memory.count(), 1);
        assert_eq!(memory.list(0, 0).len(), 1);

        memory.clear();
        assert_eq!(memory.count(), 0);
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("long_term.json");

        let mut metadata = Metadata::new();
        metadata.insert(TAGS_KEY.to_string(), json!(["x"]));
        let mut memory = VectorMemory::new();
        let id = memory.add(long_term("persisted", metadata), Some(vec![0.25, 0.75]));
        memory.save(&path).unwrap();

        let mut restored = VectorMemory::new();
        assert_eq!(restored.load(&path).unwrap(), 1);
        assert_eq!(restored.get(&id).unwrap(), memory.get(&id).unwrap());
    }
}
