//! Engine configuration, persisted as TOML under `~/.ragmind/`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::RunConstraints;
use crate::errors::{EngineError, Result};
use crate::pipeline::PipelineConfig;
use crate::processor::ProcessorConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub verbose: bool,
}

/// Endpoint and model selection for the local Ollama instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_completion_model")]
    pub completion_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_chunk_window")]
    pub chunk_window: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_response_cache_ttl_secs")]
    pub response_cache_ttl_secs: u64,
    #[serde(default = "default_embedding_cache_capacity")]
    pub embedding_cache_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_max_expansion_rounds")]
    pub max_expansion_rounds: usize,
    /// Wall-clock budget per agentic run, in seconds; 0 means unlimited
    #[serde(default)]
    pub time_limit_secs: u64,
}

fn default_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_completion_model() -> String {
    "qwen2.5:7b-instruct".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_embedding_dimension() -> usize {
    1536
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_chunk_window() -> usize {
    400
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_top_k() -> usize {
    10
}

fn default_response_cache_ttl_secs() -> u64 {
    300
}

fn default_embedding_cache_capacity() -> usize {
    4096
}

fn default_max_steps() -> usize {
    5
}

fn default_max_expansion_rounds() -> usize {
    1
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            completion_model: default_completion_model(),
            embedding_model: default_embedding_model(),
            embedding_dimension: default_embedding_dimension(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            chunk_window: default_chunk_window(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            response_cache_ttl_secs: default_response_cache_ttl_secs(),
            embedding_cache_capacity: default_embedding_cache_capacity(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_expansion_rounds: default_max_expansion_rounds(),
            time_limit_secs: 0,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default path, creating it with defaults
    /// if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = EngineConfig::default();
            config.save()?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("failed to read {}: {e}", path.display())))?;

        toml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("failed to serialize config: {e}")))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("failed to write {}: {e}", path.display())))
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("could not determine home directory".to_string()))?;

        Ok(home.join(".ragmind").join("config.toml"))
    }

    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            chunk_window: self.processing.chunk_window,
            chunk_overlap: self.processing.chunk_overlap,
            verbose: self.verbose,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            default_top_k: self.retrieval.top_k,
            verbose: self.verbose,
        }
    }

    pub fn run_constraints(&self) -> RunConstraints {
        RunConstraints {
            max_steps: self.agent.max_steps,
            max_expansion_rounds: self.agent.max_expansion_rounds,
            time_limit: match self.agent.time_limit_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            verbose: self.verbose,
        }
    }

    pub fn response_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.retrieval.response_cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.ollama.request_timeout_secs)
    }
}
