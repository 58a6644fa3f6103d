//! Core data model: documents, chunks, queries, responses, and the records
//! kept by agentic runs.

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, ChunkMetadata, ChunkType, DocumentMetadata, RawDocument, StoredDocument};
pub use query::{Query, QueryContext, QueryFilters, QueryMode, QueryOptions};
pub use response::{
    AgentDecision, ChunkHit, NextAction, Response, RetrievalStep, ScoredDocument, StepType,
};
