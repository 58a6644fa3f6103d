//! Embedding service client: text in, fixed-length vector out.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{EngineError, Result};

/// Default embedding model served by Ollama
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Embedding dimensionality of the reference baseline
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Text-to-vector service
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed one text. Errors propagate as `ServiceUnavailable`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Fixed dimensionality of every vector this client returns
    fn dimension(&self) -> usize;
}

/// Ollama-backed embedding client
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingClient {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

impl OllamaEmbeddingClient {
    /// Create a client with custom configuration
    pub fn with_config(
        base_url: &str,
        model: &str,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(EngineError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            model: model.to_string(),
            dimension,
        })
    }

    /// Create a client with default settings
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(
            base_url,
            DEFAULT_EMBEDDING_MODEL,
            DEFAULT_EMBEDDING_DIM,
            REQUEST_TIMEOUT,
        )
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let request = EmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::embedding_unavailable(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(EngineError::embedding_unavailable(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EngineError::embedding_unavailable(format!("bad response body: {e}")))?;

        if body.embedding.len() != self.dimension {
            return Err(EngineError::DimensionMismatch {
                expected: self.dimension,
                actual: body.embedding.len(),
            });
        }

        Ok(body.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}
