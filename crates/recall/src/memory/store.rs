//! Memory orchestrator
//!
//! Owns the three tiers behind one store-wide read/write lock and implements
//! consolidation (short-term to long-term) and context assembly.
//!
//! Embedding calls can take seconds, so they never run while the lock is
//! held: callers either pass a precomputed vector or the store embeds first
//! and locks afterwards.

use std::path::Path;

use serde::Serialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::MemoryConfig;
use crate::embedding::Embedder;
use crate::error::{RecallError, Result};
use crate::memory::buffer::ConversationBuffer;
use crate::memory::long_term::VectorMemory;
use crate::memory::types::{
    MemoryEntry, MemorySearchResult, MemoryStats, MemoryTier, Metadata, PRIORITY_KEY,
};
use crate::memory::working::WorkingMemory;

/// Outcome of one consolidation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationReport {
    /// Entries moved into long-term memory
    pub promoted: usize,
    /// Aged entries left where they were (no embedder, or already gone)
    pub skipped: usize,
    /// Aged entries whose embedding failed; they stay in short-term
    pub failed: usize,
}

#[derive(Debug)]
struct Tiers {
    short_term: ConversationBuffer,
    working: WorkingMemory,
    long_term: VectorMemory,
}

/// The multi-tier memory store
#[derive(Debug)]
pub struct MemoryStore {
    config: MemoryConfig,
    tiers: RwLock<Tiers>,
}

impl MemoryStore {
    /// Create an empty store with the given tier sizes and policy
    pub fn new(config: MemoryConfig) -> Self {
        let working = if config.enforce_working_max {
            WorkingMemory::enforcing(config.working_max)
        } else {
            WorkingMemory::new(config.working_max)
        };

        info!(
            "MemoryStore initialized (short_term_max={}, working_max={})",
            config.short_term_max, config.working_max
        );

        Self {
            tiers: RwLock::new(Tiers {
                short_term: ConversationBuffer::new(config.short_term_max),
                working,
                long_term: VectorMemory::new(),
            }),
            config,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Append a conversation turn, returning its id
    pub async fn add_short_term(&self, content: impl Into<String>, metadata: Metadata) -> String {
        self.insert_short_term(MemoryEntry::new(MemoryTier::ShortTerm, content, metadata))
            .await
    }

    /// Append a prebuilt entry (imported history, backdated timestamps)
    pub async fn insert_short_term(&self, entry: MemoryEntry) -> String {
        let entry = entry.move_to(MemoryTier::ShortTerm);
        let id = entry.id.clone();

        let mut tiers = self.tiers.write().await;
        if let Some(evicted) = tiers.short_term.add(entry) {
            debug!("Short-term buffer full, evicted {}", evicted.id);
        }
        id
    }

    /// Add an active-task entry with the given priority
    pub async fn add_working(&self, content: impl Into<String>, priority: i64) -> String {
        let mut metadata = Metadata::new();
        metadata.insert(PRIORITY_KEY.to_string(), json!(priority));
        let entry = MemoryEntry::new(MemoryTier::Working, content, metadata);
        let id = entry.id.clone();

        let mut tiers = self.tiers.write().await;
        if let Some(dropped) = tiers.working.add(entry) {
            debug!(
                "Working set over {}, dropped {} (priority {})",
                self.config.working_max,
                dropped.id,
                dropped.priority()
            );
        }
        id
    }

    /// Store a fact in long-term memory with an optional precomputed vector
    pub async fn add_long_term(
        &self,
        content: impl Into<String>,
        embedding: Option<Vec<f32>>,
        metadata: Metadata,
    ) -> String {
        let entry = MemoryEntry::new(MemoryTier::LongTerm, content, metadata);
        let mut tiers = self.tiers.write().await;
        tiers.long_term.add(entry, embedding)
    }

    /// Embed `content` and store it in long-term memory
    ///
    /// With no embedder the entry is stored without a vector.
    pub async fn add_long_term_text(
        &self,
        content: &str,
        metadata: Metadata,
        embedder: Option<&dyn Embedder>,
    ) -> Result<String> {
        let embedding = match embedder {
            Some(embedder) => Some(embedder.embed(content).await?),
            None => None,
        };
        Ok(self.add_long_term(content, embedding, metadata).await)
    }

    /// Long-term entries most similar to `embedding`
    pub async fn search(
        &self,
        query: &str,
        embedding: Option<&[f32]>,
        limit: usize,
    ) -> Result<Vec<MemorySearchResult>> {
        let embedding = embedding.ok_or(RecallError::EmbedderUnavailable)?;
        debug!("Searching long-term memory for {:?}", query);

        let tiers = self.tiers.read().await;
        Ok(tiers.long_term.search(embedding, limit))
    }

    /// Embed `query`, then search long-term memory
    pub async fn search_text(
        &self,
        query: &str,
        embedder: Option<&dyn Embedder>,
        limit: usize,
    ) -> Result<Vec<MemorySearchResult>> {
        let embedder = embedder.ok_or(RecallError::EmbedderUnavailable)?;
        let embedding = embedder.embed(query).await?;
        self.search(query, Some(&embedding), limit).await
    }

    /// Assemble the context block for one agent turn
    ///
    /// Fragments are added in three phases, each bounded by a share of
    /// `max_tokens` (counted in fragments, not tokens):
    ///
    /// 1. working entries while fewer than `max_tokens / 3` fragments exist
    /// 2. long-term matches scoring at least the similarity cut while fewer
    ///    than `2 * max_tokens / 3` exist; skipped without `embedding`
    /// 3. the most recent short-term entries, unconditionally
    pub async fn get_context(
        &self,
        query: &str,
        embedding: Option<&[f32]>,
        max_tokens: usize,
    ) -> String {
        let tiers = self.tiers.read().await;
        let mut parts: Vec<String> = Vec::new();

        let working_budget = max_tokens / 3;
        for entry in tiers.working.get_all() {
            if parts.len() >= working_budget {
                break;
            }
            parts.push(format!("[WORKING]: {}", entry.content));
        }

        if let Some(embedding) = embedding {
            let memory_budget = two_thirds(max_tokens);
            let matches = tiers
                .long_term
                .search(embedding, self.config.context_candidates)
                .into_iter()
                .filter(|result| result.score >= self.config.similarity_cut as f32);
            for result in matches {
                if parts.len() >= memory_budget {
                    break;
                }
                parts.push(format!(
                    "[MEMORY ({:.2})]: {}",
                    result.score, result.entry.content
                ));
            }
        }

        for entry in tiers.short_term.get_recent(self.config.context_recent) {
            parts.push(format!("[RECENT]: {}", entry.content));
        }

        debug!("Assembled {} context fragments for {:?}", parts.len(), query);
        parts.join("\n")
    }

    /// Embed `query` and assemble context
    ///
    /// An embedding failure drops the long-term phase rather than the whole
    /// context.
    pub async fn get_context_text(
        &self,
        query: &str,
        embedder: Option<&dyn Embedder>,
        max_tokens: usize,
    ) -> String {
        let embedding = match embedder {
            Some(embedder) => match embedder.embed(query).await {
                Ok(embedding) => Some(embedding),
                Err(e) => {
                    warn!("Query embedding failed, skipping long-term context: {}", e);
                    None
                }
            },
            None => None,
        };
        self.get_context(query, embedding.as_deref(), max_tokens).await
    }

    /// Move aged short-term entries into long-term memory
    ///
    /// Candidates are snapshotted under the read lock, embedded with no lock
    /// held, and moved under the write lock. An entry removed from the buffer
    /// in the meantime is not resurrected.
    pub async fn consolidate(&self, embedder: Option<&dyn Embedder>) -> ConsolidationReport {
        let candidates = {
            let tiers = self.tiers.read().await;
            tiers
                .short_term
                .entries_older_than(self.config.consolidation_age())
        };

        let mut report = ConsolidationReport::default();
        if candidates.is_empty() {
            return report;
        }
        debug!("Consolidating {} aged short-term entries", candidates.len());

        let mut ready = Vec::with_capacity(candidates.len());
        for entry in candidates {
            let vector = match (&entry.embedding, embedder) {
                (Some(existing), _) => Some(existing.clone()),
                (None, Some(embedder)) => match embedder.embed(&entry.content).await {
                    Ok(vector) => Some(vector),
                    Err(e) => {
                        warn!("Failed to embed {} for consolidation: {}", entry.id, e);
                        report.failed += 1;
                        continue;
                    }
                },
                (None, None) if self.config.promote_without_embedder => None,
                (None, None) => {
                    report.skipped += 1;
                    continue;
                }
            };
            ready.push((entry.id, vector));
        }

        let mut tiers = self.tiers.write().await;
        for (id, vector) in ready {
            match tiers.short_term.remove(&id) {
                Some(entry) => {
                    tiers.long_term.add(entry, vector);
                    report.promoted += 1;
                }
                None => report.skipped += 1,
            }
        }

        info!(
            "Consolidation promoted {} entries ({} skipped, {} failed)",
            report.promoted, report.skipped, report.failed
        );
        report
    }

    /// Up to `count` short-term entries, most recent first
    pub async fn recent(&self, count: usize) -> Vec<MemoryEntry> {
        self.tiers.read().await.short_term.get_recent(count)
    }

    /// Working entries, highest priority first
    pub async fn working_set(&self) -> Vec<MemoryEntry> {
        self.tiers.read().await.working.get_all()
    }

    pub async fn remove_short_term(&self, id: &str) -> Option<MemoryEntry> {
        self.tiers.write().await.short_term.remove(id)
    }

    pub async fn get_long_term(&self, id: &str) -> Result<MemoryEntry> {
        self.tiers.read().await.long_term.get(id)
    }

    pub async fn delete_long_term(&self, id: &str) -> Result<MemoryEntry> {
        self.tiers.write().await.long_term.delete(id)
    }

    /// One page of long-term entries, oldest first
    pub async fn list_long_term(&self, limit: usize, offset: usize) -> Vec<MemoryEntry> {
        self.tiers.read().await.long_term.list(limit, offset)
    }

    /// Empty every tier
    pub async fn clear(&self) {
        let mut tiers = self.tiers.write().await;
        tiers.short_term.clear();
        tiers.working.clear();
        tiers.long_term.clear();
        info!("Cleared all memory tiers");
    }

    pub async fn stats(&self) -> MemoryStats {
        let tiers = self.tiers.read().await;
        MemoryStats {
            short_term_count: tiers.short_term.len(),
            long_term_count: tiers.long_term.count(),
            working_count: tiers.working.len(),
        }
    }

    /// Write the long-term tier to `path`, creating parent directories
    pub async fn save(&self, path: &Path) -> Result<()> {
        let (json, count) = {
            let tiers = self.tiers.read().await;
            (tiers.long_term.to_json()?, tiers.long_term.count())
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                RecallError::Persistence(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        tokio::fs::write(path, json).await.map_err(|e| {
            RecallError::Persistence(format!("failed to write {}: {e}", path.display()))
        })?;

        info!("Saved {} long-term memories to {}", count, path.display());
        Ok(())
    }

    /// Replace the long-term tier with the snapshot at `path`
    ///
    /// A missing file loads nothing and leaves the tier unchanged.
    pub async fn load(&self, path: &Path) -> Result<usize> {
        let json = match tokio::fs::read_to_string(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No long-term snapshot at {}", path.display());
                return Ok(0);
            }
            Err(e) => {
                return Err(RecallError::Persistence(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        let loaded = self.tiers.write().await.long_term.replace_from_json(&json)?;
        info!("Loaded {} long-term memories from {}", loaded, path.display());
        Ok(loaded)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

/// `floor(2n / 3)` without overflowing `2n`
fn two_thirds(n: usize) -> usize {
    n / 3 * 2 + n % 3 * 2 / 3
}
