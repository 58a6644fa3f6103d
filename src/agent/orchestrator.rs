//! Agentic orchestrator: the multi-step retrieval-and-reasoning loop.
//!
//! Drives the `RunPhase` machine with three roles: the Planner proposes a
//! strategy, the Retriever gathers chunk results, the Reasoner judges
//! sufficiency and synthesizes the cited answer. Constraints (`max_steps`,
//! `time_limit`) truncate the run and synthesize from whatever was gathered
//! rather than erroring; the deadline is only checked between phases so an
//! in-flight external call is never torn.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use uuid::Uuid;

use crate::agent::roles::{Planner, Reasoner, Retriever};
use crate::agent::state::{PhaseEvent, RunPhase};
use crate::errors::Result;
use crate::gateway::EmbeddingGateway;
use crate::services::LlmClient;
use crate::store::VectorIndex;
use crate::types::{
    AgentDecision, ChunkHit, NextAction, Query, QueryMode, Response, RetrievalStep, ScoredDocument,
    StepType,
};

/// Top-k of the initial similarity search
const INITIAL_TOP_K: usize = 5;
/// Similarity threshold of the initial search
const INITIAL_THRESHOLD: f32 = 0.3;
/// Confidence recorded for the initial search step
const INITIAL_CONFIDENCE: f32 = 0.8;
/// Confidence recorded for the plan decision, which always succeeds
const PLAN_CONFIDENCE: f32 = 0.8;
/// Top-k of each expansion search
const EXPANSION_TOP_K: usize = 3;
/// Similarity threshold of expansion searches
const EXPANSION_THRESHOLD: f32 = 0.4;
/// Maximum expansion queries per round
const EXPANSION_QUERY_LIMIT: usize = 2;
/// Analysis confidence at or above which no expansion happens
const EXPANSION_CONFIDENCE_CEILING: f32 = 0.8;

/// Caller-tunable run constraints
#[derive(Debug, Clone)]
pub struct RunConstraints {
    /// Hard cap on recorded retrieval steps; guarantees termination
    pub max_steps: usize,
    /// Expansion rounds after the initial analysis (one-shot by default)
    pub max_expansion_rounds: usize,
    /// Wall-clock budget, checked between phases
    pub time_limit: Option<Duration>,
    pub verbose: bool,
}

impl Default for RunConstraints {
    fn default() -> Self {
        Self {
            max_steps: 5,
            max_expansion_rounds: 1,
            time_limit: None,
            verbose: false,
        }
    }
}

/// Multi-step retrieval orchestrator
pub struct AgenticOrchestrator {
    planner: Planner,
    retriever: Retriever,
    reasoner: Reasoner,
    store: Arc<dyn VectorIndex>,
    constraints: RunConstraints,
}

impl AgenticOrchestrator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        gateway: Arc<EmbeddingGateway>,
        store: Arc<dyn VectorIndex>,
        constraints: RunConstraints,
    ) -> Self {
        Self {
            planner: Planner::new(llm.clone()),
            retriever: Retriever::new(llm.clone(), gateway, store.clone()),
            reasoner: Reasoner::new(llm),
            store,
            constraints,
        }
    }

    /// Run the agentic loop for a query.
    ///
    /// Errors only on a failure the loop cannot absorb (the initial search
    /// embedding); the engine falls back to the traditional pipeline then.
    pub async fn run(&self, query: &Query) -> Result<Response> {
        let start = Instant::now();
        let mut phase = RunPhase::Plan;
        let mut steps: Vec<RetrievalStep> = Vec::new();
        let mut decisions: Vec<AgentDecision> = Vec::new();
        let mut hits: Vec<ChunkHit> = Vec::new();

        // PLAN: always succeeds, recorded as decision #1
        let plan = self.planner.plan(&query.text).await;
        decisions.push(AgentDecision {
            step: 1,
            chosen: plan.strategy.clone(),
            alternatives: vec![
                "single-pass retrieval".to_string(),
                "multi-step retrieval with expansion".to_string(),
            ],
            rationale: format!(
                "estimated {} steps at complexity {:.2}",
                plan.estimated_steps, plan.complexity
            ),
            confidence: PLAN_CONFIDENCE,
        });
        phase = phase.transition(PhaseEvent::PlanReady)?;
        self.log(phase);

        // INITIAL_SEARCH: the one step that may fail the whole run
        let initial_hits = self
            .retriever
            .search(&query.text, &query.filters, INITIAL_TOP_K, INITIAL_THRESHOLD)
            .await?;
        steps.push(RetrievalStep {
            id: Uuid::new_v4().to_string(),
            step_type: StepType::InitialSearch,
            query: query.text.clone(),
            reasoning: "initial similarity search with the original query".to_string(),
            results: initial_hits.clone(),
            confidence: INITIAL_CONFIDENCE,
            next_action: NextAction::Continue,
        });
        hits.extend(initial_hits);

        if self.deadline_exceeded(start) {
            phase = phase.transition(PhaseEvent::Abort)?;
        } else {
            phase = phase.transition(PhaseEvent::ResultsGathered)?;
        }
        self.log(phase);

        let mut analysis = None;
        if phase == RunPhase::Analyze {
            // ANALYZE: recorded as decision #2
            let result = self.reasoner.analyze(&query.text, &hits).await;
            let wants_expansion = result.needs_more_retrieval
                && result.confidence < EXPANSION_CONFIDENCE_CEILING;
            decisions.push(AgentDecision {
                step: 2,
                chosen: if wants_expansion {
                    "expand the search".to_string()
                } else {
                    "synthesize from gathered results".to_string()
                },
                alternatives: vec![
                    "expand the search".to_string(),
                    "synthesize from gathered results".to_string(),
                ],
                rationale: result.relevance.clone(),
                confidence: result.confidence,
            });

            // Leave room for the synthesis step inside the budget
            let remaining_steps = self.constraints.max_steps.saturating_sub(steps.len() + 1);
            let expand = wants_expansion
                && self.constraints.max_expansion_rounds > 0
                && remaining_steps > 0
                && !self.deadline_exceeded(start);

            if expand {
                phase = phase.transition(PhaseEvent::NeedsExpansion)?;
                self.log(phase);
                self.expand(query, &mut steps, &mut hits, remaining_steps).await;
            }
            analysis = Some(result);

            phase = phase.transition(PhaseEvent::ReadyToSynthesize)?;
        }
        self.log(phase);

        // SYNTHESIZE: combine everything gathered across all prior steps
        let synthesis = self.reasoner.synthesize(&query.text, &hits).await;
        let results = self.ranked_documents(&hits).await;
        let citations = citations(&results);
        let answer = if citations.is_empty() {
            synthesis.answer.clone()
        } else {
            format!("{}\n\nSources:\n{}", synthesis.answer, citations.join("\n"))
        };
        steps.push(RetrievalStep {
            id: Uuid::new_v4().to_string(),
            step_type: StepType::Synthesis,
            query: query.text.clone(),
            reasoning: synthesis.reasoning.clone(),
            results: Vec::new(),
            confidence: synthesis.confidence,
            next_action: NextAction::Conclude,
        });
        phase = phase.transition(PhaseEvent::SynthesisComplete)?;
        self.log(phase);
        debug_assert!(phase.is_terminal());

        let step_confidence: f32 =
            steps.iter().map(|s| s.confidence).sum::<f32>() / steps.len() as f32;
        let confidence = ((step_confidence + synthesis.confidence) / 2.0).clamp(0.0, 1.0);

        let related_queries = analysis
            .map(|a| a.gaps.into_iter().take(3).collect())
            .unwrap_or_default();
        let sources = Response::collect_sources(&results);
        let total_candidates = hits.len();

        Ok(Response {
            results,
            answer: Some(answer),
            total_candidates,
            processing_time_ms: start.elapsed().as_millis() as u64,
            confidence,
            explanation: synthesis.reasoning,
            related_queries,
            sources,
            degraded: false,
            retrieval_steps: steps,
            decisions,
            mode: QueryMode::Agentic,
        })
    }

    /// EXPAND: parallel sub-queries derived from the gathered results.
    /// Individual sub-query failures are skipped, never fatal.
    async fn expand(
        &self,
        query: &Query,
        steps: &mut Vec<RetrievalStep>,
        hits: &mut Vec<ChunkHit>,
        budget: usize,
    ) {
        let limit = EXPANSION_QUERY_LIMIT.min(budget);
        let queries = self
            .retriever
            .expansion_queries(&query.text, hits, limit)
            .await;

        if queries.is_empty() {
            return;
        }

        let searches = queries.iter().map(|expansion| {
            self.retriever
                .search(expansion, &query.filters, EXPANSION_TOP_K, EXPANSION_THRESHOLD)
        });

        for (expansion, result) in queries.iter().zip(join_all(searches).await) {
            let step_hits = match result {
                Ok(step_hits) => step_hits,
                Err(e) => {
                    if self.constraints.verbose {
                        eprintln!("[AGENT] expansion query '{expansion}' failed: {e}");
                    }
                    continue;
                }
            };

            let confidence = step_hits
                .iter()
                .map(|h| h.score)
                .fold(0.0f32, f32::max)
                .clamp(0.0, 1.0);
            steps.push(RetrievalStep {
                id: Uuid::new_v4().to_string(),
                step_type: StepType::Expansion,
                query: expansion.clone(),
                reasoning: "expansion query derived from gaps in the initial results"
                    .to_string(),
                results: step_hits.clone(),
                confidence,
                next_action: NextAction::Continue,
            });
            hits.extend(step_hits);
        }
    }

    /// Contributing documents in retrieval order, scored by their best hit
    async fn ranked_documents(&self, hits: &[ChunkHit]) -> Vec<ScoredDocument> {
        let mut seen: Vec<&str> = Vec::new();
        let mut results = Vec::new();

        for hit in hits {
            if seen.contains(&hit.document_id.as_str()) {
                continue;
            }
            seen.push(&hit.document_id);

            if let Some(document) = self.store.get(&hit.document_id).await {
                let score = hits
                    .iter()
                    .filter(|h| h.document_id == hit.document_id)
                    .map(|h| h.score)
                    .fold(0.0f32, f32::max);
                results.push(ScoredDocument { document, score });
            }
        }

        results
    }

    fn deadline_exceeded(&self, start: Instant) -> bool {
        self.constraints
            .time_limit
            .map(|limit| start.elapsed() >= limit)
            .unwrap_or(false)
    }

    fn log(&self, phase: RunPhase) {
        if self.constraints.verbose {
            eprintln!("[AGENT] phase: {}", phase.display_name());
        }
    }
}

/// `[n] title` citation lines, one per contributing document
fn citations(results: &[ScoredDocument]) -> Vec<String> {
    results
        .iter()
        .enumerate()
        .map(|(i, scored)| format!("[{}] {}", i + 1, scored.document.metadata.title))
        .collect()
}
