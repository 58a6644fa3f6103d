//! Model-derived enrichment: chunk keywords and document metadata.
//!
//! Both calls are best-effort. Keyword extraction degrades to an empty list
//! and metadata enhancement keeps the caller-supplied values unchanged.

use std::sync::Arc;

use crate::services::{parse, LlmClient};
use crate::types::DocumentMetadata;

const MAX_KEYWORDS: usize = 10;

/// Extract 5-10 salient keywords from a chunk; empty on any failure
pub async fn extract_keywords(llm: &Arc<dyn LlmClient>, content: &str) -> Vec<String> {
    let prompt = format!(
        "Extract 5 to 10 salient keywords from the text below. Respond with ONLY a \
         JSON array of strings.\n\nText:\n{content}"
    );

    let completion = match llm.complete(&prompt, 0.1).await {
        Ok(text) => text,
        Err(_) => return Vec::new(),
    };

    let mut keywords: Vec<String> = parse::extract_array(&completion)
        .and_then(|v| v.as_array().cloned())
        .map(|items| {
            items
                .iter()
                .filter_map(serde_json::Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    keywords.truncate(MAX_KEYWORDS);
    keywords
}

/// Derive difficulty, topics, sentiment, complexity and prerequisites from
/// the content. On any failure the metadata is returned unchanged.
pub async fn enhance_metadata(
    llm: &Arc<dyn LlmClient>,
    mut metadata: DocumentMetadata,
    content: &str,
) -> DocumentMetadata {
    let prompt = format!(
        "Derive attributes for the document below. Respond with ONLY a JSON object \
         with keys \"difficulty\" (\"beginner\", \"intermediate\" or \"advanced\"), \
         \"topics\" (array of strings), \"sentiment\" (string), \"complexity\" \
         (number 0-1) and \"prerequisites\" (array of strings).\n\n\
         Title: {}\n\nDocument:\n{content}",
        metadata.title
    );

    let completion = match llm.complete(&prompt, 0.1).await {
        Ok(text) => text,
        Err(_) => return metadata,
    };

    let Some(derived) = parse::extract_object(&completion) else {
        return metadata;
    };

    if let Some(difficulty) = parse::string_field(&derived, "difficulty") {
        metadata.difficulty = Some(difficulty);
    }
    let topics = parse::string_list(&derived, "topics");
    if !topics.is_empty() {
        metadata.topics = topics;
    }
    if let Some(sentiment) = parse::string_field(&derived, "sentiment") {
        metadata.sentiment = Some(sentiment);
    }
    if let Some(complexity) = parse::confidence_field(&derived, "complexity") {
        metadata.complexity = Some(complexity);
    }
    let prerequisites = parse::string_list(&derived, "prerequisites");
    if !prerequisites.is_empty() {
        metadata.prerequisites = prerequisites;
    }

    metadata
}
