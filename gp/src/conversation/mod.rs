//! Multi-turn conversation orchestration

mod orchestrator;

pub use orchestrator::{ConversationOrchestrator, OrchestratorState, TurnOutcome};
