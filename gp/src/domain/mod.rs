//! Domain types for the AI orchestration core
//!
//! Transcript messages, research findings, background work items, and the
//! goal/plan records exchanged with the UI and persistence layers.

mod conversation;
mod goal;
mod id;
mod plan;
mod research;
mod work_item;

pub use conversation::{Conversation, ConversationMessage, MessageRole, MessageTag};
pub use goal::{ExperienceLevel, Goal, GoalTask, OnboardingAnswers, Personality, TaskContext};
pub use id::generate_id;
pub use plan::{GeneratedPlan, Milestone, PlannedTask, ProgressEvaluation};
pub use research::{ClarificationPair, KnowledgeEntry, KnowledgeSource, ResearchFinding};
pub use work_item::{AIWorkItem, WorkItemError, WorkItemStatus, WorkItemType};
