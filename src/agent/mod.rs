//! Agentic retrieval: phase machine, prompt-driven roles, orchestrator.

pub mod orchestrator;
pub mod roles;
pub mod state;

pub use orchestrator::{AgenticOrchestrator, RunConstraints};
pub use roles::{Analysis, Planner, Reasoner, RetrievalPlan, Retriever, Synthesis};
pub use state::{PhaseEvent, RunPhase};
