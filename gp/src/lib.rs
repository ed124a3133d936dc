//! GoalPilot - AI orchestration core for goal coaching
//!
//! Talks to a hosted chat-completions API on behalf of a goal-tracking app:
//! resilient requests with bounded retry, repair of near-valid JSON output,
//! intent routing, clarification-first research and a background queue of
//! AI work items.
//!
//! # Modules
//!
//! - [`llm`] - Completion types, retry policy and the request executor
//! - [`decode`] - Repair and strict decoding of model output
//! - [`prompts`] - Embedded Handlebars prompt templates
//! - [`intent`] - Single-shot intent classification
//! - [`conversation`] - Multi-turn conversation orchestrator
//! - [`research`] - Search-augmented research and knowledge capture
//! - [`queue`] - Background work queue
//! - [`planner`] / [`briefing`] - Plan generation, evaluation and briefings
//! - [`config`] / [`logging`] - Configuration loading and log setup
//!
//! Every component receives its `LlmClient` explicitly; there is no global
//! client instance.

pub mod briefing;
pub mod config;
pub mod conversation;
pub mod decode;
pub mod domain;
pub mod error;
pub mod events;
pub mod intent;
pub mod llm;
pub mod logging;
pub mod planner;
pub mod prompts;
pub mod queue;
pub mod research;

// Re-export commonly used types
pub use briefing::{Briefing, BriefingGenerator, BriefingSource};
pub use config::{Config, ConversationConfig, LlmConfig, QueueConfig, ResearchConfig};
pub use conversation::{ConversationOrchestrator, OrchestratorState, TurnOutcome};
pub use decode::{DecodeError, decode, repair};
pub use domain::{
    AIWorkItem, ClarificationPair, Conversation, ConversationMessage, Goal, GoalTask, MessageRole, MessageTag,
    OnboardingAnswers, Personality, ResearchFinding, TaskContext, WorkItemStatus, WorkItemType,
};
pub use error::{PipelineError, PipelineResult};
pub use events::{EventBus, PipelineEvent};
pub use intent::{Intent, IntentClassifier};
pub use llm::{CompletionRequest, CompletionResult, LlmClient, RequestError, RequestExecutor, RetryPolicy};
pub use planner::PlanGenerator;
pub use prompts::PromptLibrary;
pub use queue::{ProcessReport, WorkQueue};
pub use research::{InMemoryKnowledgeStore, KnowledgeStore, ResearchPipeline};
