//! ragmind: a retrieval-augmented reasoning engine over a local Ollama
//! instance.
//!
//! Documents are chunked, embedded and enriched at ingestion time; queries
//! run either through a single-pass pipeline (expansion, vector search,
//! optional rerank, cached responses) or through an agentic orchestrator
//! that plans, searches, analyzes gaps, expands, and synthesizes a cited
//! answer. Every external call has a degrade path: ingestion never fails on
//! a service outage, and agentic queries fall back to single-pass search
//! before giving up.
//!
//! ```no_run
//! use std::sync::Arc;
//! use ragmind::config::EngineConfig;
//! use ragmind::engine::RagEngine;
//! use ragmind::services::{OllamaClient, OllamaEmbeddingClient};
//! use ragmind::types::Query;
//!
//! # async fn run() -> ragmind::errors::Result<()> {
//! let config = EngineConfig::default();
//! let engine = RagEngine::new(
//!     Arc::new(OllamaClient::new()?),
//!     Arc::new(OllamaEmbeddingClient::new(&config.ollama.url)?),
//!     &config,
//! );
//! let response = engine.query(&Query::new("What is retrieval-augmented generation?")).await?;
//! println!("{}", response.explanation);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod engine;
pub mod errors;
pub mod gateway;
pub mod pipeline;
pub mod processor;
pub mod services;
pub mod store;
pub mod types;

pub use config::EngineConfig;
pub use engine::{EngineStats, IngestOutcome, IngestReport, RagEngine};
pub use errors::{EngineError, Result};
pub use types::{Query, QueryFilters, QueryMode, QueryOptions, RawDocument, Response};
