//! Query expansion: rewrite the query for better recall, best-effort.

use std::sync::Arc;

use crate::services::LlmClient;
use crate::types::QueryContext;

/// Recent history entries included in the rewrite prompt
const HISTORY_WINDOW: usize = 3;

/// Rewrites queries through the language model
pub struct QueryExpander {
    llm: Arc<dyn LlmClient>,
}

impl QueryExpander {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Broaden `query` for recall, steered by the caller's conversation
    /// context when present. Never blocks the pipeline: any failure or empty
    /// rewrite returns the original query verbatim.
    pub async fn expand(&self, query: &str, context: Option<&QueryContext>) -> String {
        let mut prompt = format!(
            "Rewrite the search query below to improve recall in a semantic search \
             system. Keep the original intent, add synonyms or related phrasing. \
             Respond with ONLY the rewritten query on a single line.\n\nQuery: {query}"
        );
        if let Some(context) = context {
            if let Some(intent) = &context.intent {
                prompt.push_str(&format!("\nIntent: {intent}"));
            }
            for earlier in context.history.iter().rev().take(HISTORY_WINDOW).rev() {
                prompt.push_str(&format!("\nEarlier query: {earlier}"));
            }
        }

        match self.llm.complete(&prompt, 0.3).await {
            Ok(completion) => {
                let rewritten = completion.lines().next().unwrap_or("").trim().to_string();
                if rewritten.is_empty() {
                    query.to_string()
                } else {
                    rewritten
                }
            }
            Err(_) => query.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{EngineError, Result};
    use async_trait::async_trait;

    struct CannedLlm(&'static str);

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String> {
            Err(EngineError::llm_unavailable("down"))
        }
    }

    struct EchoPromptLlm;

    #[async_trait]
    impl LlmClient for EchoPromptLlm {
        async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String> {
            Ok(prompt.replace('\n', " "))
        }
    }

    #[tokio::test]
    async fn test_expansion_takes_first_line() {
        let expander = QueryExpander::new(Arc::new(CannedLlm(
            "retrieval augmented generation overview\nextra commentary",
        )));
        assert_eq!(
            expander.expand("what is rag", None).await,
            "retrieval augmented generation overview"
        );
    }

    #[tokio::test]
    async fn test_original_query_on_failure() {
        let expander = QueryExpander::new(Arc::new(FailingLlm));
        assert_eq!(expander.expand("what is rag", None).await, "what is rag");
    }

    #[tokio::test]
    async fn test_original_query_on_empty_rewrite() {
        let expander = QueryExpander::new(Arc::new(CannedLlm("   ")));
        assert_eq!(expander.expand("what is rag", None).await, "what is rag");
    }

    #[tokio::test]
    async fn test_context_steers_the_prompt() {
        let expander = QueryExpander::new(Arc::new(EchoPromptLlm));
        let context = QueryContext {
            history: vec![
                "old question".to_string(),
                "vector stores".to_string(),
            ],
            intent: Some("learning the basics".to_string()),
            complexity: None,
        };

        let prompt = expander.expand("what is rag", Some(&context)).await;
        assert!(prompt.contains("Intent: learning the basics"));
        assert!(prompt.contains("Earlier query: vector stores"));
    }
}
