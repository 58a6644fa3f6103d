//! Query records: free text plus structural filters and option flags.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Retrieval mode selected by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Traditional,
    Agentic,
}

impl Default for QueryMode {
    fn default() -> Self {
        QueryMode::Traditional
    }
}

/// Conversation context supplied with a query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryContext {
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub complexity: Option<f32>,
}

/// Structural filters applied before similarity scoring.
///
/// A document is excluded when ANY active filter fails.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryFilters {
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    #[serde(default)]
    pub difficulties: Option<Vec<String>>,
    /// Matches when the document's tag set intersects this one
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub published_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_before: Option<DateTime<Utc>>,
}

impl QueryFilters {
    /// True when no filter is active
    pub fn is_empty(&self) -> bool {
        self.categories.is_none()
            && self.sources.is_none()
            && self.difficulties.is_none()
            && self.tags.is_none()
            && self.published_after.is_none()
            && self.published_before.is_none()
    }
}

/// Option flags controlling a single query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOptions {
    pub top_k: usize,
    /// Minimum blended similarity score for a candidate to survive
    pub threshold: f32,
    pub rerank: bool,
    pub mode: QueryMode,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            threshold: 0.0,
            rerank: false,
            mode: QueryMode::Traditional,
        }
    }
}

/// A user request against the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub context: Option<QueryContext>,
    #[serde(default)]
    pub filters: QueryFilters,
    #[serde(default)]
    pub options: QueryOptions,
}

impl Query {
    /// Build a traditional-mode query with default options
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            user_id: None,
            context: None,
            filters: QueryFilters::default(),
            options: QueryOptions::default(),
        }
    }

    /// Stable in-process cache key over (text, filters, options).
    ///
    /// Context and user id deliberately do not participate: they are
    /// advisory prompt steering, and responses for the same text, filters
    /// and options are treated as equivalent for caching.
    pub fn cache_key(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.text.hash(&mut hasher);

        hash_opt_list(&self.filters.categories, &mut hasher);
        hash_opt_list(&self.filters.sources, &mut hasher);
        hash_opt_list(&self.filters.difficulties, &mut hasher);
        hash_opt_list(&self.filters.tags, &mut hasher);
        self.filters
            .published_after
            .map(|t| t.timestamp_millis())
            .hash(&mut hasher);
        self.filters
            .published_before
            .map(|t| t.timestamp_millis())
            .hash(&mut hasher);

        self.options.top_k.hash(&mut hasher);
        self.options.threshold.to_bits().hash(&mut hasher);
        self.options.rerank.hash(&mut hasher);
        (self.options.mode == QueryMode::Agentic).hash(&mut hasher);

        hasher.finish()
    }
}

fn hash_opt_list(list: &Option<Vec<String>>, hasher: &mut DefaultHasher) {
    match list {
        Some(values) => {
            // Order-insensitive: sort a copy so equivalent filters share a key
            let mut sorted = values.clone();
            sorted.sort();
            sorted.hash(hasher);
        }
        None => 0u8.hash(hasher),
    }
}
