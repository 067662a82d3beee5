//! Text embedding capability and vector math
//!
//! The memory tiers never talk to an embedding service directly. They take an
//! `Option<&dyn Embedder>` so a deployment without one degrades to
//! identifier-only long-term storage instead of failing.

#[cfg(feature = "local-embeddings")]
pub mod local;
pub mod ollama;
mod proptest;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::error::{RecallError, Result};

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedder;
pub use ollama::OllamaEmbedder;

/// A vector together with the model that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    #[serde(rename = "vector")]
    pub values: Vec<f32>,
    pub model: String,
}

impl Embedding {
    pub fn new(values: Vec<f32>, model: impl Into<String>) -> Self {
        Self {
            values,
            model: model.into(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }
}

/// Converts text into vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, in order
    ///
    /// The default implementation calls [`Embedder::embed`] once per text and
    /// stops at the first failure.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            let embedding = self.embed(text).await.map_err(|e| match e {
                RecallError::Transport(msg) => {
                    RecallError::Transport(format!("failed to embed text {i}: {msg}"))
                }
                other => other,
            })?;
            embeddings.push(embedding);
        }
        Ok(embeddings)
    }

    /// Name of the model producing the vectors
    fn model_name(&self) -> &str;

    /// Embed a text and tag the vector with this embedder's model name
    async fn embed_document(&self, text: &str) -> Result<Embedding> {
        let values = self.embed(text).await?;
        Ok(Embedding::new(values, self.model_name()))
    }
}

/// Build the embedder named by `config.provider`
///
/// `"none"` (or an empty provider) yields `Ok(None)`: the caller runs
/// without embedding capability.
pub fn embedder_from_config(config: &EmbeddingConfig) -> Result<Option<Arc<dyn Embedder>>> {
    match config.provider.to_lowercase().as_str() {
        "" | "none" => Ok(None),
        "ollama" => Ok(Some(Arc::new(OllamaEmbedder::from_config(config)?))),
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Some(Arc::new(LocalEmbedder::new()?))),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => Err(RecallError::Config(
            "provider \"local\" requires the local-embeddings feature".to_string(),
        )),
        other => Err(RecallError::Config(format!(
            "Unknown embedding provider: {other}"
        ))),
    }
}

/// Cosine similarity of two vectors, in [-1, 1]
///
/// Vectors of different length, empty vectors and zero-magnitude vectors all
/// score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b.iter()).fold(
        (0.0_f64, 0.0_f64, 0.0_f64),
        |(dot, na, nb), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (dot + x * y, na + x * x, nb + y * y)
        },
    );

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    ((dot / (norm_a.sqrt() * norm_b.sqrt())) as f32).clamp(-1.0, 1.0)
}

/// Dot product over the common prefix of two vectors
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Scale a vector to unit length; zero vectors are returned unchanged
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingEmbedder, MockEmbedder};

    #[test]
    fn test_cosine_similarity_identical() {
        let v = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&v, &v), 1.0);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!(sim.abs() < 0.001, "Orthogonal vectors should score ~0.0, got: {sim}");
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[-1.0, -2.0, -3.0]);
        assert!((sim + 1.0).abs() < 0.001, "Opposite vectors should score ~-1.0, got: {sim}");
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_similarity_mismatched_length() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_similarity_empty() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_dot_product() {
        assert_eq!(dot_product(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
    }

    #[test]
    fn test_normalize() {
        let n = normalize(&[3.0, 4.0]);
        assert!((n[0] - 0.6).abs() < 1e-6);
        assert!((n[1] - 0.8).abs() < 1e-6);
        assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_embedder_from_config_none() {
        let config = EmbeddingConfig {
            provider: "none".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(embedder_from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_embedder_from_config_ollama() {
        let embedder = embedder_from_config(&EmbeddingConfig::default())
            .unwrap()
            .expect("ollama embedder should be built");
        assert_eq!(embedder.model_name(), "nomic-embed-text");
    }

    #[test]
    fn test_embedder_from_config_unknown() {
        let config = EmbeddingConfig {
            provider: "carrier-pigeon".to_string(),
            ..EmbeddingConfig::default()
        };
        let err = embedder_from_config(&config).err().unwrap();
        assert!(err.to_string().contains("carrier-pigeon"));
    }

    #[tokio::test]
    async fn test_default_embed_batch_preserves_order() {
        let embedder = MockEmbedder::new();
        let texts = vec!["one".to_string(), "two".to_string()];
        let batch = embedder.embed_batch(&texts).await.unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], embedder.embed("one").await.unwrap());
        assert_eq!(batch[1], embedder.embed("two").await.unwrap());
    }

    #[tokio::test]
    async fn test_default_embed_batch_reports_failing_index() {
        let embedder = FailingEmbedder::new();
        let texts = vec!["one".to_string()];
        let err = embedder.embed_batch(&texts).await.unwrap_err();
        assert!(err.to_string().contains("failed to embed text 0"));
    }

    #[tokio::test]
    async fn test_embed_document_tags_model() {
        let embedder = MockEmbedder::new();
        let embedding = embedder.embed_document("hello").await.unwrap();
        assert_eq!(embedding.model, embedder.model_name());
        assert_eq!(embedding.dimension(), embedder.dimension());
    }
}
