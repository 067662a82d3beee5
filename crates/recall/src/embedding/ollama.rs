//! Embedder backed by an Ollama-compatible HTTP endpoint
//!
//! Sends `{model, prompt}` to `{endpoint}/api/embeddings` and reads the
//! `embedding` array from the response. Every failure, including timeouts
//! and malformed bodies, surfaces as [`RecallError::Transport`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EmbeddingConfig;
use crate::embedding::Embedder;
use crate::error::{RecallError, Result};

/// Embedder that calls an Ollama server
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    max_input_chars: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    /// Create an embedder from configuration
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RecallError::Transport(e.to_string()))?;

        info!(
            "OllamaEmbedder initialized with model: {}, endpoint: {}",
            config.model, config.endpoint
        );

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_input_chars: config.max_input_chars,
        })
    }

    /// Create an embedder for `endpoint` and `model` with default limits
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let config = EmbeddingConfig {
            endpoint: endpoint.into(),
            model: model.into(),
            ..EmbeddingConfig::default()
        };
        Self::from_config(&config)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Check whether the server answers its version endpoint
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/version", self.endpoint);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Embedding server not reachable at {}: {}", url, e);
                false
            }
        }
    }

    fn truncate<'a>(&self, text: &'a str) -> &'a str {
        match text.char_indices().nth(self.max_input_chars) {
            Some((byte_idx, _)) => &text[..byte_idx],
            None => text,
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: &self.model,
            prompt: self.truncate(text),
        };

        let url = format!("{}/api/embeddings", self.endpoint);
        debug!("Requesting embedding from: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RecallError::Transport(format!("failed to call embedding API: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RecallError::Transport(format!(
                "embedding API returned {status}: {error_text}"
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| RecallError::Transport(format!("failed to decode response: {e}")))?;

        Ok(body.embedding)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
