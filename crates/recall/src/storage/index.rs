//! In-memory vector index with JSON snapshot persistence
//!
//! Search is an exhaustive cosine scan over every stored vector. The snapshot
//! is a single JSON object keyed by identifier:
//!
//! ```json
//! { "lt_…": { "vector": [0.1, …], "metadata": { "id": "lt_…", "content": "…",
//!   "timestamp": 1700000000, "tags": ["…"], "custom": { "k": "v" } } } }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::embedding::{Embedder, cosine_similarity};
use crate::error::{RecallError, Result};

/// Search limit used when the caller passes 0
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Page size used when the caller passes 0
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Descriptive record stored next to each vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub id: String,
    pub content: String,
    /// Creation time in Unix seconds
    pub timestamp: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom: HashMap<String, String>,
}

impl VectorMetadata {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            content: content.into(),
            timestamp: Utc::now().timestamp(),
            tags: Vec::new(),
            custom: HashMap::new(),
        }
    }
}

/// A stored vector and its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorEntry {
    pub vector: Vec<f32>,
    pub metadata: VectorMetadata,
}

/// Associative store id -> (vector, metadata)
#[derive(Debug, Default)]
pub struct VectorIndex {
    entries: HashMap<String, VectorEntry>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry, returning its identifier
    ///
    /// An empty `metadata.id` is replaced with a generated `vec_` identifier.
    pub fn add(&mut self, vector: Vec<f32>, mut metadata: VectorMetadata) -> String {
        if metadata.id.is_empty() {
            metadata.id = format!("vec_{}", Uuid::now_v7().simple());
        }
        let id = metadata.id.clone();
        debug!("Indexing vector {} ({} dims)", id, vector.len());
        self.entries.insert(id.clone(), VectorEntry { vector, metadata });
        id
    }

    /// Embed `content` and index it
    ///
    /// Without an embedder the entry is stored with an empty vector and is
    /// never returned by similarity search.
    pub async fn add_text(
        &mut self,
        embedder: Option<&dyn Embedder>,
        content: &str,
        tags: Vec<String>,
        custom: HashMap<String, String>,
    ) -> Result<String> {
        let vector = match embedder {
            Some(embedder) => embedder.embed(content).await?,
            None => Vec::new(),
        };
        let metadata = VectorMetadata {
            tags,
            custom,
            ..VectorMetadata::new(content)
        };
        Ok(self.add(vector, metadata))
    }

    /// Up to `limit` entries most similar to `query`, best first
    ///
    /// Entries with an empty vector are not candidates. Equal scores are
    /// ordered by identifier.
    pub fn search(&self, query: &[f32], limit: usize) -> Vec<(VectorEntry, f32)> {
        let limit = if limit == 0 {
            DEFAULT_SEARCH_LIMIT
        } else {
            limit
        };

        let mut scored: Vec<(&VectorEntry, f32)> = self
            .entries
            .values()
            .filter(|entry| !entry.vector.is_empty())
            .map(|entry| (entry, cosine_similarity(query, &entry.vector)))
            .collect();

        scored.sort_by(|(a, sa), (b, sb)| {
            sb.total_cmp(sa)
                .then_with(|| a.metadata.id.cmp(&b.metadata.id))
        });
        scored.truncate(limit);

        debug!("Vector search returned {} results", scored.len());
        scored
            .into_iter()
            .map(|(entry, score)| (entry.clone(), score))
            .collect()
    }

    /// Embed `query` and search with it
    pub async fn search_text(
        &self,
        embedder: Option<&dyn Embedder>,
        query: &str,
        limit: usize,
    ) -> Result<Vec<(VectorEntry, f32)>> {
        let embedder = embedder.ok_or(RecallError::EmbedderUnavailable)?;
        let vector = embedder.embed(query).await?;
        Ok(self.search(&vector, limit))
    }

    pub fn get(&self, id: &str) -> Result<&VectorEntry> {
        self.entries
            .get(id)
            .ok_or_else(|| RecallError::NotFound(id.to_string()))
    }

    pub fn delete(&mut self, id: &str) -> Result<VectorEntry> {
        self.entries
            .remove(id)
            .ok_or_else(|| RecallError::NotFound(id.to_string()))
    }

    /// One page of entries ordered by timestamp, then identifier
    pub fn list(&self, limit: usize, offset: usize) -> Vec<VectorEntry> {
        let limit = if limit == 0 { DEFAULT_LIST_LIMIT } else { limit };

        let mut all: Vec<&VectorEntry> = self.entries.values().collect();
        all.sort_by(|a, b| {
            a.metadata
                .timestamp
                .cmp(&b.metadata.timestamp)
                .then_with(|| a.metadata.id.cmp(&b.metadata.id))
        });

        all.into_iter().skip(offset).take(limit).cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Pretty-printed snapshot of the whole index
    pub fn to_json(&self) -> Result<String> {
        let ordered: BTreeMap<&String, &VectorEntry> = self.entries.iter().collect();
        serde_json::to_string_pretty(&ordered)
            .map_err(|e| RecallError::Persistence(format!("failed to encode snapshot: {e}")))
    }

    /// Replace the contents with a parsed snapshot
    pub fn replace_from_json(&mut self, json: &str) -> Result<usize> {
        let entries: HashMap<String, VectorEntry> = serde_json::from_str(json)
            .map_err(|e| RecallError::Persistence(format!("failed to decode snapshot: {e}")))?;
        self.entries = entries;
        Ok(self.entries.len())
    }

    /// Write the snapshot to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                RecallError::Persistence(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        std::fs::write(path, json).map_err(|e| {
            RecallError::Persistence(format!("failed to write {}: {e}", path.display()))
        })?;
        info!("Saved {} vectors to {}", self.count(), path.display());
        Ok(())
    }

    /// Replace the contents with the snapshot at `path`
    ///
    /// A missing file is not an error; the index is left unchanged.
    pub fn load(&mut self, path: &Path) -> Result<usize> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No snapshot at {}, starting empty", path.display());
                return Ok(0);
            }
            Err(e) => {
                return Err(RecallError::Persistence(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };
        let loaded = self.replace_from_json(&json)?;
        info!("Loaded {} vectors from {}", loaded, path.display());
        Ok(loaded)
    }
}
