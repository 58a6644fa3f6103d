//! Embedding gateway: wraps the external embedding service with a bounded
//! cache and a deterministic degraded fallback.
//!
//! Two entry points with different failure policies:
//! - `embed` is strict and surfaces `ServiceUnavailable` (the query path
//!   maps this to `RetrievalUnavailable`);
//! - `embed_degraded` never fails, falling back to a pseudo-random unit
//!   vector seeded from the text so ingestion can always proceed.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::Result;
use crate::services::EmbeddingClient;

/// Default capacity of the embedding cache
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// An embedding with its provenance flag
#[derive(Debug, Clone)]
pub struct Embedding {
    pub vector: Vec<f32>,
    /// True when the vector came from the fallback path, not the service
    pub degraded: bool,
}

/// Gateway to the embedding service
pub struct EmbeddingGateway {
    client: std::sync::Arc<dyn EmbeddingClient>,
    cache: Mutex<LruCache<u64, Vec<f32>>>,
}

impl EmbeddingGateway {
    /// Create a gateway with the default cache capacity
    pub fn new(client: std::sync::Arc<dyn EmbeddingClient>) -> Self {
        Self::with_capacity(client, DEFAULT_CACHE_CAPACITY)
    }

    /// Create a gateway with a custom cache capacity
    pub fn with_capacity(client: std::sync::Arc<dyn EmbeddingClient>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            client,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Embed a text, strict: service failure propagates to the caller.
    ///
    /// Cache key is a hash of the exact input, case- and
    /// whitespace-sensitive. Only service-produced vectors are cached.
    pub async fn embed(&self, text: &str) -> Result<Embedding> {
        let key = text_key(text);

        if let Ok(mut cache) = self.cache.lock() {
            if let Some(vector) = cache.get(&key) {
                return Ok(Embedding {
                    vector: vector.clone(),
                    degraded: false,
                });
            }
        }

        let vector = self.client.embed(text).await?;

        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, vector.clone());
        }

        Ok(Embedding {
            vector,
            degraded: false,
        })
    }

    /// Embed a text, never failing.
    ///
    /// On service failure returns a pseudo-random unit vector of the correct
    /// dimensionality, seeded from the text hash so identical inputs get
    /// identical fallback vectors. Fallback vectors are never cached, so a
    /// recovered service takes over on the next call.
    pub async fn embed_degraded(&self, text: &str) -> Embedding {
        match self.embed(text).await {
            Ok(embedding) => embedding,
            Err(_) => Embedding {
                vector: fallback_vector(text_key(text), self.client.dimension()),
                degraded: true,
            },
        }
    }

    /// Dimensionality of every vector this gateway produces
    pub fn dimension(&self) -> usize {
        self.client.dimension()
    }

    /// Number of cached embeddings
    pub fn cache_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

fn text_key(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Deterministic unit-scale vector for the degraded path
fn fallback_vector(seed: u64, dimension: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut vector: Vec<f32> = (0..dimension).map(|_| rng.gen_range(-1.0..1.0)).collect();

    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    } else if let Some(first) = vector.first_mut() {
        *first = 1.0;
    }

    vector
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EngineError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingClient for CountingClient {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0, 0.0, 0.0, 0.0])
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    struct FailingClient;

    #[async_trait]
    impl EmbeddingClient for FailingClient {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(EngineError::embedding_unavailable("down"))
        }

        fn dimension(&self) -> usize {
            8
        }
    }

    #[tokio::test]
    async fn test_cache_avoids_repeat_calls() {
        let client = Arc::new(CountingClient {
            calls: AtomicUsize::new(0),
        });
        let gateway = EmbeddingGateway::new(client.clone());

        gateway.embed("hello").await.unwrap();
        gateway.embed("hello").await.unwrap();

        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.cache_len(), 1);
    }

    #[tokio::test]
    async fn test_cache_is_text_sensitive() {
        let client = Arc::new(CountingClient {
            calls: AtomicUsize::new(0),
        });
        let gateway = EmbeddingGateway::new(client.clone());

        gateway.embed("hello").await.unwrap();
        gateway.embed("Hello").await.unwrap();
        gateway.embed("hello ").await.unwrap();

        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_strict_embed_propagates_failure() {
        let gateway = EmbeddingGateway::new(Arc::new(FailingClient));
        let result = gateway.embed("text").await;
        assert!(matches!(
            result,
            Err(EngineError::ServiceUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_degraded_fallback_is_deterministic_unit_vector() {
        let gateway = EmbeddingGateway::new(Arc::new(FailingClient));

        let a = gateway.embed_degraded("same text").await;
        let b = gateway.embed_degraded("same text").await;
        let c = gateway.embed_degraded("other text").await;

        assert!(a.degraded);
        assert_eq!(a.vector, b.vector);
        assert_ne!(a.vector, c.vector);
        assert_eq!(a.vector.len(), 8);

        let norm: f32 = a.vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);

        // Fallback vectors must not poison the cache
        assert_eq!(gateway.cache_len(), 0);
    }

    #[tokio::test]
    async fn test_lru_bound_evicts() {
        let client = Arc::new(CountingClient {
            calls: AtomicUsize::new(0),
        });
        let gateway = EmbeddingGateway::with_capacity(client, 2);

        gateway.embed("a").await.unwrap();
        gateway.embed("b").await.unwrap();
        gateway.embed("c").await.unwrap();

        assert_eq!(gateway.cache_len(), 2);
    }
}
