//! External collaborators: the language model and embedding services, plus
//! defensive parsing of their untrusted text output.

pub mod embedding;
pub mod llm;
pub mod parse;

pub use embedding::{EmbeddingClient, OllamaEmbeddingClient};
pub use llm::{LlmClient, OllamaClient};
