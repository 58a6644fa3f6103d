//! Model-driven reranking of retrieved candidates.
//!
//! The model returns an id ordering; candidates it omits are appended after
//! the reranked ones in their original relative order. A rerank call never
//! drops a candidate.

use std::sync::Arc;

use crate::services::{parse, LlmClient};
use crate::types::ScoredDocument;

/// Reorders candidates by relevance to the original query
pub struct Reranker {
    llm: Arc<dyn LlmClient>,
}

impl Reranker {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Rerank `candidates` against the original (unexpanded) query.
    /// Returns the input unchanged on any service or parse failure.
    pub async fn rerank(
        &self,
        original_query: &str,
        candidates: Vec<ScoredDocument>,
    ) -> Vec<ScoredDocument> {
        if candidates.len() < 2 {
            return candidates;
        }

        let listing: String = candidates
            .iter()
            .map(|c| format!("- id: {} | title: {}\n", c.document.id, c.document.metadata.title))
            .collect();
        let prompt = format!(
            "Order the documents below from most to least relevant to the query. \
             Respond with ONLY a JSON array of document ids.\n\n\
             Query: {original_query}\n\nDocuments:\n{listing}"
        );

        let completion = match self.llm.complete(&prompt, 0.1).await {
            Ok(text) => text,
            Err(_) => return candidates,
        };

        let Some(ordering) = parse::extract_array(&completion) else {
            return candidates;
        };
        let ordered_ids: Vec<&str> = ordering
            .as_array()
            .map(|items| items.iter().filter_map(serde_json::Value::as_str).collect())
            .unwrap_or_default();

        apply_ordering(candidates, &ordered_ids)
    }
}

/// Reorder by `ordered_ids`; unknown ids are ignored and omitted candidates
/// keep their original relative order at the tail
fn apply_ordering(candidates: Vec<ScoredDocument>, ordered_ids: &[&str]) -> Vec<ScoredDocument> {
    let mut remaining: Vec<Option<ScoredDocument>> = candidates.into_iter().map(Some).collect();
    let mut reranked = Vec::with_capacity(remaining.len());

    for id in ordered_ids {
        if let Some(slot) = remaining
            .iter_mut()
            .find(|slot| slot.as_ref().map(|c| c.document.id == *id).unwrap_or(false))
        {
            if let Some(candidate) = slot.take() {
                reranked.push(candidate);
            }
        }
    }

    reranked.extend(remaining.into_iter().flatten());
    reranked
}
