//! Vector store: filtered similarity search over processed documents.
//!
//! `VectorIndex` is the capability seam; `InMemoryVectorStore` is the
//! reference backend, a `HashMap` behind a `tokio::sync::RwLock`. Reads run
//! concurrently, writes are exclusive; a single lock is acceptable for the
//! in-memory corpus sizes this backend targets.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::errors::{EngineError, Result};
use crate::types::{ChunkHit, QueryFilters, ScoredDocument, StoredDocument};

/// Weight of the document-level similarity in the blended score
const DOC_WEIGHT: f32 = 0.7;
/// Weight of the best chunk similarity in the blended score
const CHUNK_WEIGHT: f32 = 0.3;

/// Read-only index counts for operational monitoring
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks: usize,
}

/// Abstract vector index over processed documents
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace a document (last-write-wins, no merge)
    async fn upsert(&self, document: StoredDocument) -> Result<()>;

    /// Document-granularity search.
    ///
    /// Applies structural filters first, then ranks survivors by
    /// `0.7 * cosine(query, doc) + 0.3 * max chunk cosine`. Returns up to
    /// `2 * top_k` candidates (headroom for a downstream reranker), ties
    /// broken by most recent `published_at`.
    async fn search(
        &self,
        query_embedding: &[f32],
        filters: &QueryFilters,
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>>;

    /// Chunk-granularity search used by the agentic retriever
    async fn search_chunks(
        &self,
        query_embedding: &[f32],
        filters: &QueryFilters,
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ChunkHit>>;

    /// Fetch a document by identifier
    async fn get(&self, id: &str) -> Option<StoredDocument>;

    /// Index counts
    async fn stats(&self) -> IndexStats;
}

/// Cosine similarity clamped to [0, 1]; a zero vector scores 0, never NaN
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// In-memory reference backend
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    documents: RwLock<HashMap<String, StoredDocument>>,
}

impl InMemoryVectorStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_dimension(query: &[f32], stored: &[f32]) -> Result<()> {
    if query.len() != stored.len() {
        return Err(EngineError::DimensionMismatch {
            expected: stored.len(),
            actual: query.len(),
        });
    }
    Ok(())
}

/// A document is excluded when ANY active filter fails
fn matches_filters(doc: &StoredDocument, filters: &QueryFilters) -> bool {
    let meta = &doc.metadata;

    if let Some(categories) = &filters.categories {
        if !categories.contains(&meta.category) {
            return false;
        }
    }

    if let Some(sources) = &filters.sources {
        if !sources.contains(&meta.source) {
            return false;
        }
    }

    if let Some(difficulties) = &filters.difficulties {
        match &meta.difficulty {
            Some(difficulty) if difficulties.contains(difficulty) => {}
            _ => return false,
        }
    }

    if let Some(tags) = &filters.tags {
        if !meta.tags.iter().any(|tag| tags.contains(tag)) {
            return false;
        }
    }

    if let Some(after) = filters.published_after {
        if meta.published_at < after {
            return false;
        }
    }

    if let Some(before) = filters.published_before {
        if meta.published_at > before {
            return false;
        }
    }

    true
}

fn blended_score(query: &[f32], doc: &StoredDocument) -> f32 {
    let doc_score = cosine_similarity(query, &doc.embedding);
    let best_chunk = doc
        .chunks
        .iter()
        .map(|chunk| cosine_similarity(query, &chunk.embedding))
        .fold(0.0f32, f32::max);
    DOC_WEIGHT * doc_score + CHUNK_WEIGHT * best_chunk
}

#[async_trait]
impl VectorIndex for InMemoryVectorStore {
    async fn upsert(&self, document: StoredDocument) -> Result<()> {
        let mut documents = self.documents.write().await;
        documents.insert(document.id.clone(), document);
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        filters: &QueryFilters,
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredDocument>> {
        let documents = self.documents.read().await;

        let mut scored = Vec::new();
        for doc in documents.values() {
            if !matches_filters(doc, filters) {
                continue;
            }
            check_dimension(query_embedding, &doc.embedding)?;

            let score = blended_score(query_embedding, doc);
            if score >= min_score {
                scored.push(ScoredDocument {
                    document: doc.clone(),
                    score,
                });
            }
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.document
                        .metadata
                        .published_at
                        .cmp(&a.document.metadata.published_at)
                })
        });
        scored.truncate(top_k.saturating_mul(2));

        Ok(scored)
    }

    async fn search_chunks(
        &self,
        query_embedding: &[f32],
        filters: &QueryFilters,
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ChunkHit>> {
        let documents = self.documents.read().await;

        let mut hits = Vec::new();
        for doc in documents.values() {
            if !matches_filters(doc, filters) {
                continue;
            }
            for chunk in &doc.chunks {
                check_dimension(query_embedding, &chunk.embedding)?;
                let score = cosine_similarity(query_embedding, &chunk.embedding);
                if score >= min_score {
                    hits.push(ChunkHit {
                        document_id: doc.id.clone(),
                        document_title: doc.metadata.title.clone(),
                        chunk_id: chunk.id.clone(),
                        content: chunk.content.clone(),
                        score,
                    });
                }
            }
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);

        Ok(hits)
    }

    async fn get(&self, id: &str) -> Option<StoredDocument> {
        self.documents.read().await.get(id).cloned()
    }

    async fn stats(&self) -> IndexStats {
        let documents = self.documents.read().await;
        IndexStats {
            documents: documents.len(),
            chunks: documents.values().map(|d| d.chunks.len()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, ChunkMetadata, DocumentMetadata};
    use chrono::{TimeZone, Utc};
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    fn make_doc(
        id: &str,
        embedding: Vec<f32>,
        chunk_embedding: Vec<f32>,
        category: &str,
        tags: Vec<&str>,
        published_year: i32,
    ) -> StoredDocument {
        StoredDocument {
            id: id.to_string(),
            content: "content".to_string(),
            metadata: DocumentMetadata {
                title: format!("title {id}"),
                source: "test".to_string(),
                category: category.to_string(),
                tags: tags.into_iter().map(String::from).collect(),
                published_at: Utc.with_ymd_and_hms(published_year, 1, 1, 0, 0, 0).unwrap(),
                author: None,
                url: None,
                difficulty: None,
                reading_time: None,
                topics: Vec::new(),
                sentiment: None,
                complexity: None,
                prerequisites: Vec::new(),
            },
            embedding,
            chunks: vec![Chunk {
                id: format!("{id}-0"),
                content: "chunk".to_string(),
                embedding: chunk_embedding,
                position: 0,
                metadata: ChunkMetadata::default(),
            }],
            degraded: false,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_cosine_self_similarity_is_one() {
        let v = vec![0.3, -0.5, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero() {
        let v = vec![0.3, -0.5, 0.8];
        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&v, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn test_cosine_negative_clamped() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[quickcheck]
    fn prop_cosine_self_similarity(values: Vec<i8>) -> TestResult {
        let v: Vec<f32> = values.iter().map(|&x| x as f32).collect();
        if v.iter().all(|&x| x == 0.0) || v.is_empty() {
            return TestResult::discard();
        }
        TestResult::from_bool((cosine_similarity(&v, &v) - 1.0).abs() < 1e-4)
    }

    #[quickcheck]
    fn prop_cosine_in_unit_interval(a: Vec<i8>, b: Vec<i8>) -> bool {
        let a: Vec<f32> = a.iter().map(|&x| x as f32).collect();
        let b: Vec<f32> = b.iter().map(|&x| x as f32).collect();
        let score = cosine_similarity(&a, &b);
        (0.0..=1.0).contains(&score)
    }

    #[tokio::test]
    async fn test_upsert_replaces_wholesale() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(make_doc("a", vec![1.0, 0.0], vec![1.0, 0.0], "ai", vec![], 2024))
            .await
            .unwrap();
        store
            .upsert(make_doc("a", vec![0.0, 1.0], vec![0.0, 1.0], "db", vec![], 2024))
            .await
            .unwrap();

        let stats = store.stats().await;
        assert_eq!(stats.documents, 1);
        assert_eq!(store.get("a").await.unwrap().metadata.category, "db");
    }

    #[tokio::test]
    async fn test_search_respects_filters() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(make_doc("a", vec![1.0, 0.0], vec![1.0, 0.0], "ai", vec!["rag"], 2024))
            .await
            .unwrap();
        store
            .upsert(make_doc("b", vec![1.0, 0.0], vec![1.0, 0.0], "db", vec!["sql"], 2024))
            .await
            .unwrap();

        let filters = QueryFilters {
            categories: Some(vec!["ai".to_string()]),
            ..Default::default()
        };
        let results = store.search(&[1.0, 0.0], &filters, 10, 0.0).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, "a");
    }

    #[tokio::test]
    async fn test_tag_filter_requires_intersection() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(make_doc("a", vec![1.0, 0.0], vec![1.0, 0.0], "ai", vec!["rag", "ai"], 2024))
            .await
            .unwrap();

        let mut filters = QueryFilters {
            tags: Some(vec!["rag".to_string()]),
            ..Default::default()
        };
        assert_eq!(store.search(&[1.0, 0.0], &filters, 5, 0.0).await.unwrap().len(), 1);

        filters.tags = Some(vec!["python".to_string()]);
        assert!(store.search(&[1.0, 0.0], &filters, 5, 0.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_date_range_filter() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(make_doc("old", vec![1.0, 0.0], vec![1.0, 0.0], "ai", vec![], 2020))
            .await
            .unwrap();
        store
            .upsert(make_doc("new", vec![1.0, 0.0], vec![1.0, 0.0], "ai", vec![], 2025))
            .await
            .unwrap();

        let filters = QueryFilters {
            published_after: Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        let results = store.search(&[1.0, 0.0], &filters, 10, 0.0).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, "new");
    }

    #[tokio::test]
    async fn test_blended_score_prefers_doc_similarity() {
        let store = InMemoryVectorStore::new();
        // Doc a: perfect doc match, orthogonal chunk. Doc b: the reverse.
        store
            .upsert(make_doc("a", vec![1.0, 0.0], vec![0.0, 1.0], "ai", vec![], 2024))
            .await
            .unwrap();
        store
            .upsert(make_doc("b", vec![0.0, 1.0], vec![1.0, 0.0], "ai", vec![], 2024))
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], &QueryFilters::default(), 10, 0.0).await.unwrap();
        assert_eq!(results[0].document.id, "a");
        assert!((results[0].score - 0.7).abs() < 1e-6);
        assert!((results[1].score - 0.3).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_ties_broken_by_recency() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(make_doc("older", vec![1.0, 0.0], vec![1.0, 0.0], "ai", vec![], 2020))
            .await
            .unwrap();
        store
            .upsert(make_doc("newer", vec![1.0, 0.0], vec![1.0, 0.0], "ai", vec![], 2025))
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], &QueryFilters::default(), 10, 0.0).await.unwrap();
        assert_eq!(results[0].document.id, "newer");
    }

    #[tokio::test]
    async fn test_search_returns_double_top_k() {
        let store = InMemoryVectorStore::new();
        for i in 0..10 {
            store
                .upsert(make_doc(&format!("d{i}"), vec![1.0, 0.0], vec![1.0, 0.0], "ai", vec![], 2024))
                .await
                .unwrap();
        }

        let results = store.search(&[1.0, 0.0], &QueryFilters::default(), 3, 0.0).await.unwrap();
        assert_eq!(results.len(), 6);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_fatal() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(make_doc("a", vec![1.0, 0.0], vec![1.0, 0.0], "ai", vec![], 2024))
            .await
            .unwrap();

        let result = store.search(&[1.0, 0.0, 0.0], &QueryFilters::default(), 5, 0.0).await;
        assert!(matches!(result, Err(EngineError::DimensionMismatch { .. })));
    }

    #[tokio::test]
    async fn test_search_chunks_threshold() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(make_doc("a", vec![1.0, 0.0], vec![1.0, 0.0], "ai", vec![], 2024))
            .await
            .unwrap();
        store
            .upsert(make_doc("b", vec![1.0, 0.0], vec![0.0, 1.0], "ai", vec![], 2024))
            .await
            .unwrap();

        let hits = store
            .search_chunks(&[1.0, 0.0], &QueryFilters::default(), 10, 0.5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, "a");
    }
}
