//! AIWorkItem domain type
//!
//! Tracks one unit of asynchronous AI work through its status lifecycle:
//! `pending -> in_progress -> {completed, failed}`. Terminal states are final;
//! a failed item is retried by creating a new item, never by moving back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::id::generate_id;

/// Kind of AI work to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemType {
    Research,
    Report,
    ToolPrompt,
    IdeaGeneration,
}

impl WorkItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Report => "report",
            Self::ToolPrompt => "tool_prompt",
            Self::IdeaGeneration => "idea_generation",
        }
    }
}

impl std::fmt::Display for WorkItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Work item status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    /// Waiting for the next processing pass
    #[default]
    Pending,
    /// Upstream call issued, result not yet recorded
    InProgress,
    /// Result recorded
    Completed,
    /// Could not complete; see `error`
    Failed,
}

impl WorkItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether the lifecycle allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: WorkItemStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress) | (Self::InProgress, Self::Completed) | (Self::InProgress, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejected status change
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkItemError {
    #[error("Illegal work item transition {from} -> {to}")]
    IllegalTransition { from: WorkItemStatus, to: WorkItemStatus },
}

/// A unit of background AI work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AIWorkItem {
    pub id: String,
    pub goal_id: String,
    pub task_id: Option<String>,
    #[serde(rename = "type")]
    pub item_type: WorkItemType,
    pub title: String,
    /// Free-text brief the prompt is built from
    #[serde(default)]
    pub instructions: String,
    status: WorkItemStatus,
    result: Option<String>,
    #[serde(default)]
    error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl AIWorkItem {
    /// Create a new pending work item with generated ID
    pub fn new(goal_id: impl Into<String>, item_type: WorkItemType, title: impl Into<String>) -> Self {
        let title = title.into();
        debug!(%item_type, %title, "AIWorkItem::new: called");
        Self {
            id: generate_id("work", &title),
            goal_id: goal_id.into(),
            task_id: None,
            item_type,
            title,
            instructions: String::new(),
            status: WorkItemStatus::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// A fresh pending copy of this item under a new ID
    pub fn requeued(&self) -> Self {
        debug!(id = %self.id, "AIWorkItem::requeued: called");
        let mut item = Self::new(self.goal_id.clone(), self.item_type, self.title.clone());
        item.task_id = self.task_id.clone();
        item.instructions = self.instructions.clone();
        item
    }

    pub fn status(&self) -> WorkItemStatus {
        self.status
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    fn transition(&mut self, next: WorkItemStatus) -> Result<(), WorkItemError> {
        if !self.status.can_transition_to(next) {
            debug!(id = %self.id, from = %self.status, to = %next, "AIWorkItem::transition: rejected");
            return Err(WorkItemError::IllegalTransition {
                from: self.status,
                to: next,
            });
        }
        debug!(id = %self.id, from = %self.status, to = %next, "AIWorkItem::transition: applied");
        self.status = next;
        Ok(())
    }

    /// `pending -> in_progress`
    pub fn start(&mut self) -> Result<(), WorkItemError> {
        self.transition(WorkItemStatus::InProgress)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// `in_progress -> completed`, recording the result
    pub fn complete(&mut self, result: impl Into<String>) -> Result<(), WorkItemError> {
        self.transition(WorkItemStatus::Completed)?;
        self.result = Some(result.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// `in_progress -> failed`; `result` and `completed_at` stay unset
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), WorkItemError> {
        self.transition(WorkItemStatus::Failed)?;
        self.error = Some(reason.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_is_pending() {
        let item = AIWorkItem::new("goal-1", WorkItemType::Research, "Competitor pricing");
        assert_eq!(item.status(), WorkItemStatus::Pending);
        assert!(item.result().is_none());
        assert!(item.completed_at().is_none());
        assert!(item.id.contains("-work-competitor-pricing"));
    }

    #[test]
    fn test_happy_path_lifecycle() {
        let mut item = AIWorkItem::new("goal-1", WorkItemType::Report, "Weekly report");
        item.start().unwrap();
        assert_eq!(item.status(), WorkItemStatus::InProgress);
        assert!(item.started_at().is_some());

        item.complete("All good").unwrap();
        assert_eq!(item.status(), WorkItemStatus::Completed);
        assert_eq!(item.result(), Some("All good"));
        assert!(item.completed_at().is_some());
    }

    #[test]
    fn test_fail_leaves_result_and_completed_at_unset() {
        let mut item = AIWorkItem::new("goal-1", WorkItemType::Research, "x");
        item.start().unwrap();
        item.fail("upstream down").unwrap();
        assert_eq!(item.status(), WorkItemStatus::Failed);
        assert!(item.result().is_none());
        assert!(item.completed_at().is_none());
        assert_eq!(item.error(), Some("upstream down"));
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut done = AIWorkItem::new("g", WorkItemType::Research, "x");
        done.start().unwrap();
        done.complete("r").unwrap();
        assert!(done.start().is_err());
        assert!(done.fail("late").is_err());
        assert_eq!(done.status(), WorkItemStatus::Completed);

        let mut failed = AIWorkItem::new("g", WorkItemType::Research, "x");
        failed.start().unwrap();
        failed.fail("boom").unwrap();
        assert_eq!(
            failed.start(),
            Err(WorkItemError::IllegalTransition {
                from: WorkItemStatus::Failed,
                to: WorkItemStatus::InProgress,
            })
        );
        assert!(failed.complete("r").is_err());
    }

    #[test]
    fn test_cannot_skip_in_progress() {
        let mut item = AIWorkItem::new("g", WorkItemType::ToolPrompt, "x");
        assert!(item.complete("r").is_err());
        assert!(item.fail("r").is_err());
        assert_eq!(item.status(), WorkItemStatus::Pending);
    }

    #[test]
    fn test_transition_table() {
        use WorkItemStatus::*;
        let all = [Pending, InProgress, Completed, Failed];
        let allowed = [(Pending, InProgress), (InProgress, Completed), (InProgress, Failed)];
        for from in all {
            for to in all {
                assert_eq!(from.can_transition_to(to), allowed.contains(&(from, to)), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_requeued_copy_is_fresh() {
        let mut item = AIWorkItem::new("g", WorkItemType::IdeaGeneration, "Ideas")
            .with_task("t-1")
            .with_instructions("side projects");
        item.start().unwrap();
        item.fail("crash").unwrap();

        let copy = item.requeued();
        assert_ne!(copy.id, item.id);
        assert_eq!(copy.status(), WorkItemStatus::Pending);
        assert_eq!(copy.task_id.as_deref(), Some("t-1"));
        assert_eq!(copy.instructions, "side projects");
        assert!(copy.error().is_none());
    }

    #[test]
    fn test_serde_uses_type_field() {
        let item = AIWorkItem::new("g", WorkItemType::ToolPrompt, "Prompt");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "tool_prompt");
        assert_eq!(json["status"], "pending");
    }
}
