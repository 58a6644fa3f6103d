//! Traditional single-pass query pipeline.
//!
//! Sequencing: cache lookup, query expansion, query embedding, vector
//! search, optional rerank, explanation and related-query generation,
//! response assembly, cache store. Everything after the cache miss is
//! best-effort except the embedding and search steps; an unreachable
//! embedding service surfaces as `RetrievalUnavailable`.

pub mod cache;
pub mod expansion;
pub mod rerank;

use std::sync::Arc;
use std::time::Instant;

use crate::errors::{EngineError, Result};
use crate::gateway::EmbeddingGateway;
use crate::services::{parse, LlmClient};
use crate::store::VectorIndex;
use crate::types::{Query, QueryMode, Response};
use cache::ResponseCache;
use expansion::QueryExpander;
use rerank::Reranker;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub default_top_k: usize,
    pub verbose: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_top_k: 10,
            verbose: false,
        }
    }
}

/// Single-pass retrieval pipeline
pub struct QueryPipeline {
    gateway: Arc<EmbeddingGateway>,
    store: Arc<dyn VectorIndex>,
    llm: Arc<dyn LlmClient>,
    expander: QueryExpander,
    reranker: Reranker,
    cache: Arc<ResponseCache>,
    config: PipelineConfig,
}

impl QueryPipeline {
    pub fn new(
        gateway: Arc<EmbeddingGateway>,
        store: Arc<dyn VectorIndex>,
        llm: Arc<dyn LlmClient>,
        cache: Arc<ResponseCache>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            expander: QueryExpander::new(llm.clone()),
            reranker: Reranker::new(llm.clone()),
            gateway,
            store,
            llm,
            cache,
            config,
        }
    }

    /// Run a traditional-mode search
    pub async fn search(&self, query: &Query) -> Result<Response> {
        let start = Instant::now();
        let key = query.cache_key();

        if let Some(mut cached) = self.cache.get(key) {
            if self.config.verbose {
                eprintln!("[PIPELINE] cache hit for query '{}'", query.text);
            }
            cached.processing_time_ms = start.elapsed().as_millis() as u64;
            return Ok(cached);
        }

        let expanded = self.expander.expand(&query.text, query.context.as_ref()).await;
        if self.config.verbose && expanded != query.text {
            eprintln!("[PIPELINE] expanded query: '{expanded}'");
        }

        // The one hard dependency on the query path
        let embedding = self.gateway.embed(&expanded).await.map_err(|e| match e {
            EngineError::ServiceUnavailable { reason, .. } => {
                EngineError::RetrievalUnavailable(reason)
            }
            other => other,
        })?;

        let top_k = if query.options.top_k == 0 {
            self.config.default_top_k
        } else {
            query.options.top_k
        };

        let candidates = self
            .store
            .search(&embedding.vector, &query.filters, top_k, query.options.threshold)
            .await?;
        let total_candidates = candidates.len();

        let mut results = if query.options.rerank {
            self.reranker.rerank(&query.text, candidates).await
        } else {
            candidates
        };
        results.truncate(top_k);

        let explanation = self.explain(&query.text, results.len()).await;
        let related_queries = self.related_queries(&query.text).await;

        let sources = Response::collect_sources(&results);
        let confidence = confidence(results.len(), sources.len());

        let response = Response {
            results,
            answer: None,
            total_candidates,
            processing_time_ms: start.elapsed().as_millis() as u64,
            confidence,
            explanation,
            related_queries,
            sources,
            degraded: false,
            retrieval_steps: Vec::new(),
            decisions: Vec::new(),
            mode: QueryMode::Traditional,
        };

        self.cache.insert(key, response.clone());
        Ok(response)
    }

    /// One-sentence explanation of the result set, generic text on failure
    async fn explain(&self, query: &str, result_count: usize) -> String {
        let prompt = format!(
            "In one sentence, explain to a user why a semantic search for the query \
             below returned {result_count} result(s). Respond with the sentence only.\n\n\
             Query: {query}"
        );

        match self.llm.complete(&prompt, 0.3).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => format!("Found {result_count} document(s) semantically related to \"{query}\"."),
        }
    }

    /// Small set of related queries, generic suggestions on failure
    async fn related_queries(&self, query: &str) -> Vec<String> {
        let prompt = format!(
            "Suggest 3 short follow-up search queries related to the query below. \
             Respond with ONLY a JSON array of strings.\n\nQuery: {query}"
        );

        let suggestions = match self.llm.complete(&prompt, 0.5).await {
            Ok(text) => parse::extract_array(&text)
                .and_then(|v| v.as_array().cloned())
                .map(|items| {
                    items
                        .iter()
                        .filter_map(serde_json::Value::as_str)
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .take(3)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        if suggestions.is_empty() {
            vec![
                format!("{query} overview"),
                format!("{query} examples"),
            ]
        } else {
            suggestions
        }
    }
}

/// Response confidence; an empty result set scores 0
pub fn confidence(result_count: usize, distinct_sources: usize) -> f32 {
    if result_count == 0 {
        return 0.0;
    }
    let volume = 0.5 * (result_count as f32 / 10.0).min(1.0);
    let diversity = if distinct_sources > 1 { 0.2 } else { 0.0 };
    (volume + 0.3 + diversity).min(1.0)
}
