//! Document and chunk records.
//!
//! A `RawDocument` crosses the ingestion boundary; the processor turns it
//! into a `StoredDocument` owned by the vector store. Documents are replaced
//! wholesale on re-ingestion, never merged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw document accepted at the ingestion boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub summary: String,
    pub category: String,
    pub source: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub reading_time: Option<u32>,
}

/// Metadata carried by a stored document.
///
/// The optional enrichment fields (topics, sentiment, complexity,
/// prerequisites) are filled by the language model when available; on model
/// failure the caller-supplied values are kept unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub source: String,
    pub category: String,
    pub tags: Vec<String>,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub reading_time: Option<u32>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub complexity: Option<f32>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

impl DocumentMetadata {
    /// Build metadata from a raw document, enrichment fields empty
    pub fn from_raw(raw: &RawDocument) -> Self {
        Self {
            title: raw.title.clone(),
            source: raw.source.clone(),
            category: raw.category.clone(),
            tags: raw.tags.clone(),
            published_at: raw.published_at,
            author: raw.author.clone(),
            url: raw.url.clone(),
            difficulty: raw.difficulty.clone(),
            reading_time: raw.reading_time,
            topics: Vec::new(),
            sentiment: None,
            complexity: None,
            prerequisites: Vec::new(),
        }
    }
}

/// Semantic role of a chunk within its document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    Title,
    Summary,
    Content,
    Conclusion,
}

impl ChunkType {
    /// Parse a model-supplied tag, defaulting to `Content`
    pub fn parse_lenient(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "title" => ChunkType::Title,
            "summary" => ChunkType::Summary,
            "conclusion" => ChunkType::Conclusion,
            _ => ChunkType::Content,
        }
    }
}

/// Chunk-level metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub chunk_type: ChunkType,
    /// Importance score, always clamped to 1..=10
    pub importance: u8,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Default for ChunkMetadata {
    fn default() -> Self {
        Self {
            chunk_type: ChunkType::Content,
            importance: 5,
            keywords: Vec::new(),
        }
    }
}

/// A contiguous semantic slice of a document's text.
///
/// Chunks never outlive their owning document and have no independent
/// lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub position: usize,
    pub metadata: ChunkMetadata,
}

/// A processed document as held by the vector store.
///
/// Invariants: `chunks` is non-empty and every chunk embedding has the same
/// dimensionality as `embedding`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub content: String,
    pub metadata: DocumentMetadata,
    pub embedding: Vec<f32>,
    pub chunks: Vec<Chunk>,
    /// Set when any embedding came from the degraded fallback path
    #[serde(default)]
    pub degraded: bool,
    pub updated_at: DateTime<Utc>,
}
