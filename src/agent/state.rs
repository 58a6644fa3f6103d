//! Agentic run phase machine.
//!
//! Deterministic finite phase machine for a retrieval-and-reasoning run:
//! `Plan → InitialSearch → Analyze → (Expand) → Synthesize → Done`.
//! There is no cycle back from Synthesize, and Abort jumps any non-terminal
//! phase to Synthesize so a truncated run still answers from partial
//! results.

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};

/// Phases of an agentic run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunPhase {
    /// Planner proposes a retrieval strategy
    Plan,

    /// Retriever runs the first similarity search
    InitialSearch,

    /// Reasoner inspects gathered results for sufficiency
    Analyze,

    /// Retriever runs expansion sub-queries (conditional)
    Expand,

    /// Reasoner combines everything into a cited answer
    Synthesize,

    /// Terminal phase
    Done,
}

/// Events that advance a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Plan produced (or defaulted)
    PlanReady,

    /// Initial search results gathered
    ResultsGathered,

    /// Analysis asks for more retrieval
    NeedsExpansion,

    /// Analysis (or expansion) is satisfied
    ReadyToSynthesize,

    /// Final answer assembled
    SynthesisComplete,

    /// Constraint exceeded; synthesize from whatever was gathered
    Abort,
}

impl RunPhase {
    /// Check if this is the terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Done)
    }

    /// Attempt a phase transition.
    ///
    /// Valid transitions:
    /// 1. Plan          → InitialSearch (PlanReady)
    /// 2. InitialSearch → Analyze       (ResultsGathered)
    /// 3. Analyze       → Expand        (NeedsExpansion)
    /// 4. Analyze       → Synthesize    (ReadyToSynthesize)
    /// 5. Expand        → Synthesize    (ReadyToSynthesize)
    /// 6. Synthesize    → Done          (SynthesisComplete)
    /// 7. any non-terminal → Synthesize (Abort)
    /// 8. Done          → Done          (terminal self-loop)
    pub fn transition(&self, event: PhaseEvent) -> Result<RunPhase> {
        use PhaseEvent::*;
        use RunPhase::*;

        if *self == Done {
            return Ok(Done);
        }

        if event == Abort {
            return Ok(Synthesize);
        }

        let next = match (self, event) {
            (Plan, PlanReady) => InitialSearch,
            (InitialSearch, ResultsGathered) => Analyze,
            (Analyze, NeedsExpansion) => Expand,
            (Analyze, ReadyToSynthesize) => Synthesize,
            (Expand, ReadyToSynthesize) => Synthesize,
            (Synthesize, SynthesisComplete) => Done,
            (from, event) => {
                return Err(EngineError::InvalidTransition {
                    from: format!("{from:?}"),
                    event: format!("{event:?}"),
                });
            }
        };

        Ok(next)
    }

    /// Human-readable phase name
    pub fn display_name(&self) -> &'static str {
        match self {
            RunPhase::Plan => "Planning",
            RunPhase::InitialSearch => "Initial Search",
            RunPhase::Analyze => "Analyzing Results",
            RunPhase::Expand => "Expanding Search",
            RunPhase::Synthesize => "Synthesizing Answer",
            RunPhase::Done => "Done",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_without_expansion() {
        let phase = RunPhase::Plan;
        let phase = phase.transition(PhaseEvent::PlanReady).unwrap();
        assert_eq!(phase, RunPhase::InitialSearch);
        let phase = phase.transition(PhaseEvent::ResultsGathered).unwrap();
        assert_eq!(phase, RunPhase::Analyze);
        let phase = phase.transition(PhaseEvent::ReadyToSynthesize).unwrap();
        assert_eq!(phase, RunPhase::Synthesize);
        let phase = phase.transition(PhaseEvent::SynthesisComplete).unwrap();
        assert!(phase.is_terminal());
    }

    #[test]
    fn test_expansion_branch() {
        let phase = RunPhase::Analyze.transition(PhaseEvent::NeedsExpansion).unwrap();
        assert_eq!(phase, RunPhase::Expand);
        let phase = phase.transition(PhaseEvent::ReadyToSynthesize).unwrap();
        assert_eq!(phase, RunPhase::Synthesize);
    }

    #[test]
    fn test_no_cycle_back_from_synthesize() {
        let result = RunPhase::Synthesize.transition(PhaseEvent::NeedsExpansion);
        assert!(result.is_err());
        let result = RunPhase::Synthesize.transition(PhaseEvent::ResultsGathered);
        assert!(result.is_err());
    }

    #[test]
    fn test_abort_jumps_to_synthesize_from_any_phase() {
        for phase in [
            RunPhase::Plan,
            RunPhase::InitialSearch,
            RunPhase::Analyze,
            RunPhase::Expand,
        ] {
            assert_eq!(phase.transition(PhaseEvent::Abort).unwrap(), RunPhase::Synthesize);
        }
    }

    #[test]
    fn test_done_is_terminal_self_loop() {
        assert_eq!(
            RunPhase::Done.transition(PhaseEvent::PlanReady).unwrap(),
            RunPhase::Done
        );
        assert_eq!(RunPhase::Done.transition(PhaseEvent::Abort).unwrap(), RunPhase::Done);
    }

    #[test]
    fn test_invalid_transition_is_error() {
        let result = RunPhase::Plan.transition(PhaseEvent::ResultsGathered);
        assert!(matches!(result, Err(EngineError::InvalidTransition { .. })));
    }

    #[test]
    fn test_determinism() {
        let a = RunPhase::Analyze.transition(PhaseEvent::NeedsExpansion).unwrap();
        let b = RunPhase::Analyze.transition(PhaseEvent::NeedsExpansion).unwrap();
        assert_eq!(a, b);
    }
}
