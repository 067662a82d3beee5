//! Test utilities for recall - embedders that need no network or model
//!
//! - [`MockEmbedder`]: deterministic hash-based vectors
//! - [`FixedEmbedder`]: returns vectors from a lookup table
//! - [`FailingEmbedder`]: every call fails with a transport error

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::embedding::Embedder;
use crate::error::{RecallError, Result};

/// Dimension produced by [`MockEmbedder::new`]
pub const MOCK_DIMENSION: usize = 384;

/// Mock embedder for fast tests that don't need a real model.
/// Produces deterministic vectors based on the input text hash.
#[derive(Debug)]
pub struct MockEmbedder {
    dimension: usize,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::with_dimension(MOCK_DIMENSION)
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of `embed` calls served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The vector `embed` returns for `text`, computed synchronously
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        (0..self.dimension)
            .map(|i| {
                let x = seed
                    .wrapping_mul(i as u64 + 1)
                    .wrapping_add(0x9e3779b97f4a7c15);
                let normalized = (x as f32) / (u64::MAX as f32);
                (normalized * 2.0) - 1.0
            })
            .collect()
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector_for(text))
    }

    fn model_name(&self) -> &str {
        "mock-embedder"
    }
}

/// Embedder returning hand-picked vectors; unknown text is a transport error
#[derive(Debug, Default)]
pub struct FixedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl FixedEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| RecallError::Transport(format!("no fixed vector for {text:?}")))
    }

    fn model_name(&self) -> &str {
        "fixed-embedder"
    }
}

/// Embedder whose every call fails, standing in for an unreachable service
#[derive(Debug, Default)]
pub struct FailingEmbedder;

impl FailingEmbedder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RecallError::Transport("connection refused".to_string()))
    }

    fn model_name(&self) -> &str {
        "failing-embedder"
    }
}
