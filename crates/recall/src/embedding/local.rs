//! On-device embedder using fastembed
//!
//! Only compiled with the `local-embeddings` feature. The model is CPU bound,
//! so inference runs on the blocking pool.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel as FastEmbedModel, InitOptions, TextEmbedding};
use tracing::info;

use crate::embedding::Embedder;
use crate::error::{RecallError, Result};

pub const LOCAL_EMBEDDING_DIMENSION: usize = 384;

const LOCAL_MODEL_NAME: &str = "multilingual-e5-small";

/// Embedder running a small multilingual model in-process
#[derive(Clone)]
pub struct LocalEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl LocalEmbedder {
    pub fn new() -> Result<Self> {
        let model = TextEmbedding::try_new(InitOptions::new(FastEmbedModel::MultilingualE5Small))
            .map_err(|e| RecallError::Config(format!("failed to load local model: {e}")))?;
        info!("LocalEmbedder initialized with model: {}", LOCAL_MODEL_NAME);
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| RecallError::Transport("local model lock poisoned".to_string()))?;
            model
                .embed(texts, None)
                .map_err(|e| RecallError::Transport(e.to_string()))
        })
        .await
        .map_err(|e| RecallError::Transport(format!("embedding task failed: {e}")))?
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.run(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RecallError::Transport("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.run(texts.to_vec()).await
    }

    fn model_name(&self) -> &str {
        LOCAL_MODEL_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[tokio::test]
    #[ignore = "downloads model weights"]
    async fn test_embed_returns_correct_dimension() {
        let embedder = LocalEmbedder::new().expect("Failed to load model");
        let embedding = embedder.embed("Hello, world!").await.expect("Failed to embed");
        assert_eq!(embedding.len(), LOCAL_EMBEDDING_DIMENSION);
    }

    #[tokio::test]
    #[ignore = "downloads model weights"]
    async fn test_similar_texts_have_high_similarity() {
        let embedder = LocalEmbedder::new().expect("Failed to load model");

        let emb1 = embedder.embed("The quick brown fox jumps over the lazy dog").await.unwrap();
        let emb2 = embedder.embed("A fast brown fox leaps over a sleepy dog").await.unwrap();
        let emb3 = embedder.embed("Quantum computing revolutionizes cryptography").await.unwrap();

        let sim_similar = cosine_similarity(&emb1, &emb2);
        let sim_different = cosine_similarity(&emb1, &emb3);
        assert!(
            sim_similar > sim_different,
            "Similar texts ({:.3}) should score above different texts ({:.3})",
            sim_similar,
            sim_different
        );
    }
}
