//! Document processor: raw document in, embedded and enriched
//! `StoredDocument` out.
//!
//! The processor is pure in the sense that it never touches the vector
//! store; insertion is the caller's responsibility. Every external call has
//! a degrade path, so only an empty content body is a hard failure.

pub mod chunker;
pub mod enrich;

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;

use crate::errors::{EngineError, Result};
use crate::gateway::EmbeddingGateway;
use crate::services::LlmClient;
use crate::types::{Chunk, ChunkMetadata, DocumentMetadata, RawDocument, StoredDocument};
use chunker::{ChunkPiece, FixedSizeChunker, SemanticChunker};

/// How much leading content joins the title and summary in the
/// document-level embedding input
const DOC_EMBED_CONTENT_CHARS: usize = 1000;

/// Processor configuration
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub chunk_window: usize,
    pub chunk_overlap: usize,
    pub verbose: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            chunk_window: chunker::DEFAULT_WINDOW,
            chunk_overlap: chunker::DEFAULT_OVERLAP,
            verbose: false,
        }
    }
}

/// Turns raw documents into stored documents
pub struct DocumentProcessor {
    llm: Arc<dyn LlmClient>,
    gateway: Arc<EmbeddingGateway>,
    semantic: SemanticChunker,
    fallback: FixedSizeChunker,
    config: ProcessorConfig,
}

impl DocumentProcessor {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        gateway: Arc<EmbeddingGateway>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            semantic: SemanticChunker::new(llm.clone()),
            fallback: FixedSizeChunker::new(config.chunk_window, config.chunk_overlap),
            llm,
            gateway,
            config,
        }
    }

    /// Process a raw document: chunk, embed, extract keywords, enhance
    /// metadata. Fails only when the content body is empty.
    pub async fn process(&self, raw: &RawDocument) -> Result<StoredDocument> {
        if raw.content.trim().is_empty() {
            return Err(EngineError::Chunking(format!(
                "document '{}' has no content",
                raw.id
            )));
        }

        let pieces = match self.semantic.chunk(&raw.title, &raw.content).await {
            Ok(pieces) => pieces,
            Err(e) => {
                if self.config.verbose {
                    eprintln!("[PROCESS] semantic chunking failed ({e}), using fixed-size fallback");
                }
                self.fallback.chunk(&raw.content)
            }
        };

        // Document-level embedding input: title + summary + leading content
        let doc_text = format!(
            "{}\n{}\n{}",
            raw.title,
            raw.summary,
            truncate_chars(&raw.content, DOC_EMBED_CONTENT_CHARS)
        );
        let doc_embedding = self.gateway.embed_degraded(&doc_text).await;
        let mut degraded = doc_embedding.degraded;

        // Chunk embedding and keyword extraction are order-independent, so
        // run them concurrently across chunks
        let chunk_futures = pieces.iter().enumerate().map(|(position, piece)| {
            let gateway = self.gateway.clone();
            let llm = self.llm.clone();
            async move {
                let embedding = gateway.embed_degraded(&piece.content).await;
                let keywords = enrich::extract_keywords(&llm, &piece.content).await;
                (position, piece.clone(), embedding, keywords)
            }
        });

        let mut chunks = Vec::with_capacity(pieces.len());
        for (position, piece, embedding, keywords) in join_all(chunk_futures).await {
            degraded |= embedding.degraded;
            chunks.push(build_chunk(&raw.id, position, piece, embedding.vector, keywords));
        }

        let metadata = DocumentMetadata::from_raw(raw);
        let metadata = enrich::enhance_metadata(&self.llm, metadata, &raw.content).await;

        if self.config.verbose {
            eprintln!(
                "[PROCESS] document '{}': {} chunks, degraded={degraded}",
                raw.id,
                chunks.len()
            );
        }

        Ok(StoredDocument {
            id: raw.id.clone(),
            content: raw.content.clone(),
            metadata,
            embedding: doc_embedding.vector,
            chunks,
            degraded,
            updated_at: Utc::now(),
        })
    }
}

fn build_chunk(
    doc_id: &str,
    position: usize,
    piece: ChunkPiece,
    embedding: Vec<f32>,
    keywords: Vec<String>,
) -> Chunk {
    Chunk {
        id: format!("{doc_id}-{position}"),
        content: piece.content,
        embedding,
        position,
        metadata: ChunkMetadata {
            chunk_type: piece.chunk_type,
            importance: piece.importance,
            keywords,
        },
    }
}

/// First `n` characters of `text`, respecting char boundaries
fn truncate_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((byte_offset, _)) => &text[..byte_offset],
        None => text,
    }
}
