//! Engine facade: ingestion on one side, query dispatch on the other.
//!
//! Wires the processor, vector store, traditional pipeline and agentic
//! orchestrator together behind two entry points, `ingest` and `query`.
//! Agentic queries degrade in stages: orchestrator failure falls back to a
//! single-pass search, and if that also fails the caller gets a minimal
//! degraded response instead of an error.

use std::sync::Arc;

use crate::agent::AgenticOrchestrator;
use crate::config::EngineConfig;
use crate::errors::Result;
use crate::gateway::EmbeddingGateway;
use crate::pipeline::{cache::ResponseCache, QueryPipeline};
use crate::processor::DocumentProcessor;
use crate::services::{EmbeddingClient, LlmClient};
use crate::store::{InMemoryVectorStore, VectorIndex};
use crate::types::{Query, QueryMode, RawDocument, Response};

/// Confidence reported when every retrieval path is down
const OUTAGE_CONFIDENCE: f32 = 0.05;

/// Corpus and cache counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub documents: usize,
    pub chunks: usize,
    pub embedding_cache_entries: usize,
    pub response_cache_entries: usize,
}

/// Per-document result of an ingestion
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub document_id: String,
    pub chunks: usize,
    /// True when any embedding came from the fallback path
    pub degraded: bool,
}

/// Aggregate result of a batch ingestion; failed documents are reported,
/// never silently dropped
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub ingested: Vec<IngestOutcome>,
    pub failures: Vec<(String, String)>,
}

impl IngestReport {
    pub fn degraded_count(&self) -> usize {
        self.ingested.iter().filter(|o| o.degraded).count()
    }
}

/// Retrieval-augmented reasoning engine
pub struct RagEngine {
    processor: DocumentProcessor,
    pipeline: QueryPipeline,
    orchestrator: AgenticOrchestrator,
    store: Arc<dyn VectorIndex>,
    gateway: Arc<EmbeddingGateway>,
    cache: Arc<ResponseCache>,
    verbose: bool,
}

impl RagEngine {
    /// Build an engine over a fresh in-memory store
    pub fn new(
        llm: Arc<dyn LlmClient>,
        embedder: Arc<dyn EmbeddingClient>,
        config: &EngineConfig,
    ) -> Self {
        Self::with_store(llm, embedder, Arc::new(InMemoryVectorStore::new()), config)
    }

    /// Build an engine over a caller-supplied store
    pub fn with_store(
        llm: Arc<dyn LlmClient>,
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorIndex>,
        config: &EngineConfig,
    ) -> Self {
        let gateway = Arc::new(EmbeddingGateway::with_capacity(
            embedder,
            config.retrieval.embedding_cache_capacity,
        ));
        let cache = Arc::new(ResponseCache::new(config.response_cache_ttl()));

        Self {
            processor: DocumentProcessor::new(
                llm.clone(),
                gateway.clone(),
                config.processor_config(),
            ),
            pipeline: QueryPipeline::new(
                gateway.clone(),
                store.clone(),
                llm.clone(),
                cache.clone(),
                config.pipeline_config(),
            ),
            orchestrator: AgenticOrchestrator::new(
                llm,
                gateway.clone(),
                store.clone(),
                config.run_constraints(),
            ),
            store,
            gateway,
            cache,
            verbose: config.verbose,
        }
    }

    /// Ingest one raw document: process, upsert, invalidate cached responses.
    /// Fails only when the document has no content or the store rejects it.
    pub async fn ingest(&self, raw: &RawDocument) -> Result<IngestOutcome> {
        let document = self.processor.process(raw).await?;
        let outcome = IngestOutcome {
            document_id: document.id.clone(),
            chunks: document.chunks.len(),
            degraded: document.degraded,
        };

        self.store.upsert(document).await?;
        self.cache.clear();

        if self.verbose {
            eprintln!(
                "[ENGINE] ingested '{}' ({} chunks, degraded={})",
                outcome.document_id, outcome.chunks, outcome.degraded
            );
        }

        Ok(outcome)
    }

    /// Ingest a batch; one bad document never aborts the rest
    pub async fn ingest_batch(&self, documents: &[RawDocument]) -> IngestReport {
        let mut report = IngestReport::default();

        for raw in documents {
            match self.ingest(raw).await {
                Ok(outcome) => report.ingested.push(outcome),
                Err(e) => {
                    if self.verbose {
                        eprintln!("[ENGINE] ingestion of '{}' failed: {e}", raw.id);
                    }
                    report.failures.push((raw.id.clone(), e.to_string()));
                }
            }
        }

        report
    }

    /// Answer a query in the mode its options select
    pub async fn query(&self, query: &Query) -> Result<Response> {
        match query.options.mode {
            QueryMode::Traditional => self.pipeline.search(query).await,
            QueryMode::Agentic => self.query_agentic(query).await,
        }
    }

    /// Agentic dispatch with staged degradation: orchestrator, then the
    /// single-pass pipeline, then a minimal degraded response
    async fn query_agentic(&self, query: &Query) -> Result<Response> {
        let run_error = match self.orchestrator.run(query).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        if self.verbose {
            eprintln!("[ENGINE] agentic run failed ({run_error}), falling back to single-pass search");
        }

        match self.pipeline.search(query).await {
            Ok(mut response) => {
                response.degraded = true;
                response.explanation = format!(
                    "Multi-step retrieval was unavailable ({run_error}); \
                     results come from a single-pass search. {}",
                    response.explanation
                );
                Ok(response)
            }
            Err(search_error) => {
                if self.verbose {
                    eprintln!("[ENGINE] fallback search also failed: {search_error}");
                }
                let mut response = Response::empty(QueryMode::Agentic);
                response.degraded = true;
                response.confidence = OUTAGE_CONFIDENCE;
                response.explanation = format!(
                    "Retrieval is temporarily unavailable: {search_error}"
                );
                Ok(response)
            }
        }
    }

    /// Corpus and cache counters
    pub async fn stats(&self) -> EngineStats {
        let index = self.store.stats().await;
        EngineStats {
            documents: index.documents,
            chunks: index.chunks,
            embedding_cache_entries: self.gateway.cache_len(),
            response_cache_entries: self.cache.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EngineError;
    use async_trait::async_trait;
    use chrono::Utc;

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String> {
            Err(EngineError::llm_unavailable("down"))
        }
    }

    struct UnitEmbedder;

    #[async_trait]
    impl EmbeddingClient for UnitEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingClient for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(EngineError::embedding_unavailable("down"))
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn raw_doc(id: &str, content: &str) -> RawDocument {
        RawDocument {
            id: id.to_string(),
            title: format!("Title {id}"),
            content: content.to_string(),
            summary: "summary".to_string(),
            category: "ai".to_string(),
            source: "test".to_string(),
            tags: vec!["rag".to_string()],
            published_at: Utc::now(),
            author: None,
            url: None,
            difficulty: None,
            reading_time: None,
        }
    }

    fn engine(embedder: Arc<dyn EmbeddingClient>) -> RagEngine {
        RagEngine::new(Arc::new(FailingLlm), embedder, &EngineConfig::default())
    }

    #[tokio::test]
    async fn test_ingest_and_traditional_query() {
        let engine = engine(Arc::new(UnitEmbedder));
        engine.ingest(&raw_doc("d1", "retrieval basics")).await.unwrap();

        let response = engine.query(&Query::new("retrieval")).await.unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.mode, QueryMode::Traditional);
    }

    #[tokio::test]
    async fn test_ingest_clears_response_cache() {
        let engine = engine(Arc::new(UnitEmbedder));
        engine.ingest(&raw_doc("d1", "first")).await.unwrap();

        engine.query(&Query::new("q")).await.unwrap();
        assert_eq!(engine.stats().await.response_cache_entries, 1);

        engine.ingest(&raw_doc("d2", "second")).await.unwrap();
        assert_eq!(engine.stats().await.response_cache_entries, 0);

        // Re-query now sees both documents
        let response = engine.query(&Query::new("q")).await.unwrap();
        assert_eq!(response.results.len(), 2);
    }

    #[tokio::test]
    async fn test_batch_reports_failures_without_aborting() {
        let engine = engine(Arc::new(UnitEmbedder));
        let report = engine
            .ingest_batch(&[raw_doc("ok", "content"), raw_doc("bad", "   ")])
            .await;

        assert_eq!(report.ingested.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "bad");
    }

    #[tokio::test]
    async fn test_degraded_ingestion_still_queryable_corpus() {
        let engine = engine(Arc::new(FailingEmbedder));
        let outcome = engine.ingest(&raw_doc("d1", "content body")).await.unwrap();
        assert!(outcome.degraded);
        assert_eq!(engine.stats().await.documents, 1);
    }

    #[tokio::test]
    async fn test_traditional_query_fails_when_embedder_down() {
        let engine = engine(Arc::new(FailingEmbedder));
        engine.ingest(&raw_doc("d1", "content body")).await.unwrap();

        let result = engine.query(&Query::new("q")).await;
        assert!(matches!(result, Err(EngineError::RetrievalUnavailable(_))));
    }

    #[tokio::test]
    async fn test_agentic_outage_yields_minimal_response() {
        let engine = engine(Arc::new(FailingEmbedder));
        engine.ingest(&raw_doc("d1", "content body")).await.unwrap();

        let mut query = Query::new("q");
        query.options.mode = QueryMode::Agentic;
        let response = engine.query(&query).await.unwrap();

        assert!(response.degraded);
        assert!(response.results.is_empty());
        assert!((response.confidence - 0.05).abs() < 1e-6);
        assert!(response.explanation.contains("unavailable"));
    }

    #[tokio::test]
    async fn test_agentic_query_succeeds_with_working_embedder() {
        let engine = engine(Arc::new(UnitEmbedder));
        engine.ingest(&raw_doc("d1", "content body")).await.unwrap();

        let mut query = Query::new("q");
        query.options.mode = QueryMode::Agentic;
        let response = engine.query(&query).await.unwrap();

        assert_eq!(response.mode, QueryMode::Agentic);
        assert!(response.answer.is_some());
        assert!(!response.retrieval_steps.is_empty());
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let engine = engine(Arc::new(UnitEmbedder));
        engine.ingest(&raw_doc("d1", "content body")).await.unwrap();
        engine.ingest(&raw_doc("d2", "other body")).await.unwrap();

        let stats = engine.stats().await;
        assert_eq!(stats.documents, 2);
        assert!(stats.chunks >= 2);
        assert!(stats.embedding_cache_entries > 0);
    }
}
