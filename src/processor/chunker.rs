//! Chunking strategies.
//!
//! The semantic chunker asks the language model to split content into
//! 200-500 character units tagged with a type and importance. Any service
//! or parse failure falls back to the deterministic fixed-size chunker,
//! whose output is lossless: concatenating the chunks reconstructs the
//! original content modulo overlap.

use std::sync::Arc;

use crate::errors::{EngineError, Result};
use crate::services::{parse, LlmClient};
use crate::types::ChunkType;

/// Fixed-size window in characters
pub const DEFAULT_WINDOW: usize = 400;
/// Overlap between consecutive windows in characters
pub const DEFAULT_OVERLAP: usize = 50;

/// A chunk before embedding and keyword extraction
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPiece {
    pub content: String,
    pub chunk_type: ChunkType,
    pub importance: u8,
}

/// Deterministic character-window chunker.
///
/// Boundaries are character-based, never byte-based, so multi-byte text is
/// never split inside a code point. Identical input always produces
/// identical boundaries.
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    window: usize,
    overlap: usize,
}

impl FixedSizeChunker {
    pub fn new(window: usize, overlap: usize) -> Self {
        // A zero window, or a window no larger than the overlap, would
        // never advance
        let window = window.max(1);
        let overlap = if overlap >= window { window / 2 } else { overlap };
        Self { window, overlap }
    }

    /// Split `text` into overlapping windows. Empty input yields no chunks.
    pub fn chunk(&self, text: &str) -> Vec<ChunkPiece> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary, plus the end of the text
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());
        let n_chars = boundaries.len() - 1;

        let step = self.window - self.overlap;
        let mut pieces = Vec::new();
        let mut start = 0;

        while start < n_chars {
            let end = (start + self.window).min(n_chars);
            pieces.push(ChunkPiece {
                content: text[boundaries[start]..boundaries[end]].to_string(),
                chunk_type: ChunkType::Content,
                importance: 5,
            });
            if end == n_chars {
                break;
            }
            start += step;
        }

        pieces
    }
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_OVERLAP)
    }
}

/// Model-driven chunker producing typed, importance-scored units
pub struct SemanticChunker {
    llm: Arc<dyn LlmClient>,
}

impl SemanticChunker {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Ask the model to split `content` into semantic units.
    ///
    /// Errors on service failure or malformed output; the caller falls back
    /// to `FixedSizeChunker`.
    pub async fn chunk(&self, title: &str, content: &str) -> Result<Vec<ChunkPiece>> {
        let prompt = format!(
            "Split the document below into semantically coherent chunks of 200 to 500 \
             characters. Respond with ONLY a JSON array where each element is an object \
             with keys \"content\" (string), \"type\" (one of \"title\", \"summary\", \
             \"content\", \"conclusion\") and \"importance\" (integer 1-10).\n\n\
             Title: {title}\n\nDocument:\n{content}"
        );

        let completion = self.llm.complete(&prompt, 0.2).await?;

        let array = parse::extract_array(&completion).ok_or_else(|| {
            EngineError::Chunking("semantic chunking returned no parseable array".to_string())
        })?;

        let items = array
            .as_array()
            .cloned()
            .unwrap_or_default();

        let pieces: Vec<ChunkPiece> = items
            .iter()
            .filter_map(|item| {
                let content = parse::string_field(item, "content")?;
                let chunk_type = parse::string_field(item, "type")
                    .map(|t| ChunkType::parse_lenient(&t))
                    .unwrap_or(ChunkType::Content);
                let importance = item
                    .get("importance")
                    .and_then(serde_json::Value::as_i64)
                    .unwrap_or(5)
                    .clamp(1, 10) as u8;
                Some(ChunkPiece {
                    content,
                    chunk_type,
                    importance,
                })
            })
            .collect();

        if pieces.is_empty() {
            return Err(EngineError::Chunking(
                "semantic chunking produced no usable units".to_string(),
            ));
        }

        Ok(pieces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunker = FixedSizeChunker::default();
        assert!(chunker.chunk("").is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = FixedSizeChunker::default();
        let pieces = chunker.chunk("short text");
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].content, "short text");
        assert_eq!(pieces[0].chunk_type, ChunkType::Content);
    }

    #[test]
    fn test_windows_overlap() {
        let chunker = FixedSizeChunker::new(10, 3);
        let text = "abcdefghijklmnopqrstuvwxyz";
        let pieces = chunker.chunk(text);

        assert_eq!(pieces[0].content, "abcdefghij");
        // Next window starts 7 chars in, repeating the 3-char overlap
        assert_eq!(pieces[1].content, "hijklmnopq");
    }

    #[test]
    fn test_lossless_modulo_overlap() {
        let chunker = FixedSizeChunker::new(10, 3);
        let text = "abcdefghijklmnopqrstuvwxyz0123456789";
        let pieces = chunker.chunk(text);

        // Dropping each chunk's leading overlap reconstructs the original
        let mut rebuilt = pieces[0].content.clone();
        for piece in &pieces[1..] {
            rebuilt.push_str(&piece.content[piece.content.char_indices().nth(3).map(|(i, _)| i).unwrap_or(0)..]);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_multibyte_text_never_panics() {
        let chunker = FixedSizeChunker::new(4, 1);
        let text = "héllo wörld — ünïcode ♥ text";
        let pieces = chunker.chunk(text);
        assert!(!pieces.is_empty());
        let total: String = pieces.iter().map(|p| p.content.as_str()).collect();
        assert!(total.contains('♥'));
    }

    #[test]
    fn test_degenerate_overlap_still_advances() {
        // overlap >= window would loop forever without the constructor guard
        let chunker = FixedSizeChunker::new(4, 10);
        let pieces = chunker.chunk("abcdefghij");
        assert!(pieces.len() > 1);
    }

    #[test]
    fn test_zero_window_still_terminates() {
        // window 0 would push empty pieces forever without the clamp
        let chunker = FixedSizeChunker::new(0, 0);
        let pieces = chunker.chunk("ab");
        assert_eq!(pieces.len(), 2);
        assert!(pieces.iter().all(|p| !p.content.is_empty()));
    }

    #[test]
    fn test_zero_window_with_overlap_still_terminates() {
        let chunker = FixedSizeChunker::new(0, 50);
        let pieces = chunker.chunk("abc");
        assert_eq!(pieces.len(), 3);
    }

    #[quickcheck]
    fn prop_rechunking_is_idempotent(text: String) -> bool {
        let chunker = FixedSizeChunker::default();
        chunker.chunk(&text) == chunker.chunk(&text)
    }

    #[quickcheck]
    fn prop_chunks_cover_all_content(text: String) -> TestResult {
        if text.is_empty() {
            return TestResult::discard();
        }
        let chunker = FixedSizeChunker::new(20, 5);
        let pieces = chunker.chunk(&text);

        let covered: usize = pieces.iter().map(|p| p.content.chars().count()).sum();
        let original = text.chars().count();
        // Overlap only adds characters, never removes them
        TestResult::from_bool(covered >= original)
    }
}
