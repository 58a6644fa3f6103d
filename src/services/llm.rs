//! Language model service client.
//!
//! `LlmClient` is the injectable seam for every prompt-driven component;
//! the default implementation talks to Ollama's generate endpoint. Callers
//! must treat completions as untrusted text (see `services::parse`).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{EngineError, Result};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default completion model
pub const DEFAULT_COMPLETION_MODEL: &str = "qwen2.5:7b-instruct";

/// Request timeout (30 seconds)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Prompt-to-text completion service
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete a prompt. A malformed or irrelevant completion is a normal
    /// failure mode; only transport-level problems return an error.
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String>;
}

/// Ollama-backed completion client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    /// Create a client with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_OLLAMA_URL, DEFAULT_COMPLETION_MODEL, REQUEST_TIMEOUT)
    }

    /// Create a client with custom configuration
    pub fn with_config(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(EngineError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            model: model.to_string(),
        })
    }

    /// Check whether the service answers at all
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/version", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Get current model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: Some(GenerateOptions { temperature }),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::llm_unavailable(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EngineError::llm_unavailable(format!(
                "HTTP {status}: {error_text}"
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| EngineError::llm_unavailable(format!("bad response body: {e}")))?;

        Ok(body.response)
    }
}

/// Ollama generate request
#[derive(Debug, Clone, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Debug, Clone, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

/// Ollama generate response (non-streaming)
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}
