//! Prompt-driven roles of the agentic orchestrator.
//!
//! Planner, Retriever and Reasoner are independent strategy objects over
//! the same language model client. Model output is parsed defensively; each
//! role has a fixed fallback so the orchestrator never stalls on a garbled
//! completion.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::gateway::EmbeddingGateway;
use crate::services::{parse, LlmClient};
use crate::store::VectorIndex;
use crate::types::{ChunkHit, QueryFilters};

/// Retrieval strategy proposed by the Planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalPlan {
    pub strategy: String,
    pub estimated_steps: u32,
    pub complexity: f32,
}

impl Default for RetrievalPlan {
    fn default() -> Self {
        Self {
            strategy: "broad semantic search, then gap-driven expansion".to_string(),
            estimated_steps: 3,
            complexity: 0.5,
        }
    }
}

/// Sufficiency analysis returned by the Reasoner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub relevance: String,
    pub gaps: Vec<String>,
    pub confidence: f32,
    pub needs_more_retrieval: bool,
}

impl Default for Analysis {
    fn default() -> Self {
        Self {
            relevance: "analysis unavailable; treating gathered results as sufficient"
                .to_string(),
            gaps: Vec::new(),
            confidence: 0.5,
            needs_more_retrieval: false,
        }
    }
}

/// Final answer assembled by the Reasoner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Synthesis {
    pub answer: String,
    pub confidence: f32,
    pub reasoning: String,
}

/// Plans the retrieval strategy; never fails
pub struct Planner {
    llm: Arc<dyn LlmClient>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Propose a strategy for the query, defaulting on any failure
    pub async fn plan(&self, query: &str) -> RetrievalPlan {
        let prompt = format!(
            "Plan a multi-step retrieval strategy for the question below. Respond with \
             ONLY a JSON object with keys \"strategy\" (string), \"estimated_steps\" \
             (integer) and \"complexity\" (number 0-1).\n\nQuestion: {query}"
        );

        let completion = match self.llm.complete(&prompt, 0.3).await {
            Ok(text) => text,
            Err(_) => return RetrievalPlan::default(),
        };

        let Some(value) = parse::extract_object(&completion) else {
            return RetrievalPlan::default();
        };

        let default = RetrievalPlan::default();
        RetrievalPlan {
            strategy: parse::string_field(&value, "strategy").unwrap_or(default.strategy),
            estimated_steps: value
                .get("estimated_steps")
                .and_then(serde_json::Value::as_i64)
                .map(|n| n.clamp(1, 10) as u32)
                .unwrap_or(default.estimated_steps),
            complexity: parse::confidence_field(&value, "complexity")
                .unwrap_or(default.complexity),
        }
    }
}

/// Runs similarity searches and derives expansion queries
pub struct Retriever {
    llm: Arc<dyn LlmClient>,
    gateway: Arc<EmbeddingGateway>,
    store: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        gateway: Arc<EmbeddingGateway>,
        store: Arc<dyn VectorIndex>,
    ) -> Self {
        Self { llm, gateway, store }
    }

    /// Chunk-granularity similarity search. Embedding failures propagate:
    /// an agentic run without retrieval falls back to the traditional
    /// pipeline at the engine level.
    pub async fn search(
        &self,
        query: &str,
        filters: &QueryFilters,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<ChunkHit>> {
        let embedding = self.gateway.embed(query).await?;
        self.store
            .search_chunks(&embedding.vector, filters, top_k, threshold)
            .await
    }

    /// Up to `limit` expansion queries derived from the gathered results;
    /// empty on any failure
    pub async fn expansion_queries(
        &self,
        query: &str,
        hits: &[ChunkHit],
        limit: usize,
    ) -> Vec<String> {
        let snippets = summarize_hits(hits, 5);
        let prompt = format!(
            "The question below was answered only partially by the passages. Suggest up \
             to {limit} short follow-up search queries that would fill the gaps. Respond \
             with ONLY a JSON array of strings.\n\nQuestion: {query}\n\nPassages:\n{snippets}"
        );

        let completion = match self.llm.complete(&prompt, 0.4).await {
            Ok(text) => text,
            Err(_) => return Vec::new(),
        };

        parse::extract_array(&completion)
            .and_then(|v| v.as_array().cloned())
            .map(|items| {
                items
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .take(limit)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Analyzes sufficiency and synthesizes the final answer
pub struct Reasoner {
    llm: Arc<dyn LlmClient>,
}

impl Reasoner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Inspect gathered results for relevance and gaps; neutral defaults on
    /// any failure so the run proceeds to synthesis
    pub async fn analyze(&self, query: &str, hits: &[ChunkHit]) -> Analysis {
        let snippets = summarize_hits(hits, 8);
        let prompt = format!(
            "Assess whether the passages below are sufficient to answer the question. \
             Respond with ONLY a JSON object with keys \"relevance\" (string), \"gaps\" \
             (array of strings), \"confidence\" (number 0-1) and \
             \"needs_more_retrieval\" (boolean).\n\nQuestion: {query}\n\nPassages:\n{snippets}"
        );

        let completion = match self.llm.complete(&prompt, 0.2).await {
            Ok(text) => text,
            Err(_) => return Analysis::default(),
        };

        let Some(value) = parse::extract_object(&completion) else {
            return Analysis::default();
        };

        let default = Analysis::default();
        Analysis {
            relevance: parse::string_field(&value, "relevance").unwrap_or(default.relevance),
            gaps: parse::string_list(&value, "gaps"),
            confidence: parse::confidence_field(&value, "confidence")
                .unwrap_or(default.confidence),
            needs_more_retrieval: parse::bool_field(&value, "needs_more_retrieval")
                .unwrap_or(default.needs_more_retrieval),
        }
    }

    /// Combine every gathered result into a final answer. The extractive
    /// fallback concatenates the best passages at low confidence.
    pub async fn synthesize(&self, query: &str, hits: &[ChunkHit]) -> Synthesis {
        if hits.is_empty() {
            return Synthesis {
                answer: "No relevant documents were found for this question.".to_string(),
                confidence: 0.0,
                reasoning: "the retrieval steps produced no results".to_string(),
            };
        }

        let snippets = summarize_hits(hits, 10);
        let prompt = format!(
            "Answer the question using ONLY the passages below. Respond with ONLY a \
             JSON object with keys \"answer\" (string), \"confidence\" (number 0-1) and \
             \"reasoning\" (string).\n\nQuestion: {query}\n\nPassages:\n{snippets}"
        );

        let completion = match self.llm.complete(&prompt, 0.2).await {
            Ok(text) => text,
            Err(_) => return extractive_fallback(hits),
        };

        let Some(value) = parse::extract_object(&completion) else {
            return extractive_fallback(hits);
        };

        match parse::string_field(&value, "answer") {
            Some(answer) => Synthesis {
                answer,
                confidence: parse::confidence_field(&value, "confidence").unwrap_or(0.5),
                reasoning: parse::string_field(&value, "reasoning")
                    .unwrap_or_else(|| "synthesized from retrieved passages".to_string()),
            },
            None => extractive_fallback(hits),
        }
    }
}

/// Top passages joined for a prompt, best scores first
fn summarize_hits(hits: &[ChunkHit], limit: usize) -> String {
    hits.iter()
        .take(limit)
        .map(|hit| format!("[{}] {}\n", hit.document_title, hit.content))
        .collect()
}

fn extractive_fallback(hits: &[ChunkHit]) -> Synthesis {
    let answer: String = hits
        .iter()
        .take(3)
        .map(|hit| hit.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    Synthesis {
        answer,
        confidence: 0.3,
        reasoning: "synthesis model unavailable; returning extracted passages".to_string(),
    }
}
