//! Response records, including the append-only step and decision logs kept
//! by agentic runs.

use serde::{Deserialize, Serialize};

use crate::types::document::StoredDocument;
use crate::types::query::QueryMode;

/// A document with its blended relevance score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: StoredDocument,
    pub score: f32,
}

/// One chunk-granularity retrieval result used by agentic steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkHit {
    pub document_id: String,
    pub document_title: String,
    pub chunk_id: String,
    pub content: String,
    pub score: f32,
}

/// Kind of agentic retrieval step.
///
/// The built-in orchestrator records `InitialSearch`, `Expansion` and
/// `Synthesis`; `Refinement` and `Verification` complete the wire vocabulary
/// for richer run strategies over the same step log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    InitialSearch,
    Refinement,
    Verification,
    Expansion,
    Synthesis,
}

/// Hint recorded with each step about what the run does next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextAction {
    Continue,
    Refine,
    Expand,
    Conclude,
}

/// One recorded iteration of the agentic loop; append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalStep {
    pub id: String,
    pub step_type: StepType,
    pub query: String,
    pub reasoning: String,
    pub results: Vec<ChunkHit>,
    pub confidence: f32,
    pub next_action: NextAction,
}

/// A recorded choice between alternatives during an agentic run; append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDecision {
    pub step: usize,
    pub chosen: String,
    pub alternatives: Vec<String>,
    pub rationale: String,
    pub confidence: f32,
}

/// Engine response for both modes.
///
/// Traditional mode fills `results`; agentic mode additionally fills
/// `answer`, `retrieval_steps`, and `decisions`. `confidence` is always
/// clamped to [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub results: Vec<ScoredDocument>,
    #[serde(default)]
    pub answer: Option<String>,
    pub total_candidates: usize,
    pub processing_time_ms: u64,
    pub confidence: f32,
    pub explanation: String,
    #[serde(default)]
    pub related_queries: Vec<String>,
    /// Deduplicated source names in rank order
    #[serde(default)]
    pub sources: Vec<String>,
    /// Set when the response came from a fallback path
    #[serde(default)]
    pub degraded: bool,
    #[serde(default)]
    pub retrieval_steps: Vec<RetrievalStep>,
    #[serde(default)]
    pub decisions: Vec<AgentDecision>,
    pub mode: QueryMode,
}

impl Response {
    /// Empty response skeleton for the given mode
    pub fn empty(mode: QueryMode) -> Self {
        Self {
            results: Vec::new(),
            answer: None,
            total_candidates: 0,
            processing_time_ms: 0,
            confidence: 0.0,
            explanation: String::new(),
            related_queries: Vec::new(),
            sources: Vec::new(),
            degraded: false,
            retrieval_steps: Vec::new(),
            decisions: Vec::new(),
            mode,
        }
    }

    /// Deduplicated source names from ranked results, rank order preserved
    pub fn collect_sources(results: &[ScoredDocument]) -> Vec<String> {
        let mut sources = Vec::new();
        for scored in results {
            let source = &scored.document.metadata.source;
            if !sources.contains(source) {
                sources.push(source.clone());
            }
        }
        sources
    }
}
