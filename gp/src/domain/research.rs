//! Research findings and the knowledge-base records derived from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::id::generate_id;

/// One clarifying question and the user's answer to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationPair {
    pub question: String,
    pub answer: String,
}

impl ClarificationPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Result of one completed research cycle
///
/// Immutable after creation. Only built once synthesis has succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchFinding {
    pub id: String,
    pub query: String,
    pub clarifications: Vec<ClarificationPair>,
    pub result: String,
    pub timestamp: DateTime<Utc>,
    pub auto_saved: bool,
}

impl ResearchFinding {
    pub fn new(
        query: impl Into<String>,
        clarifications: Vec<ClarificationPair>,
        result: impl Into<String>,
        auto_saved: bool,
    ) -> Self {
        let query = query.into();
        debug!(%query, clarification_count = clarifications.len(), "ResearchFinding::new: called");
        Self {
            id: generate_id("finding", &query),
            query,
            clarifications,
            result: result.into(),
            timestamp: Utc::now(),
            auto_saved,
        }
    }
}

/// Where a knowledge-base entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeSource {
    Research,
}

/// Durable knowledge record owned by a goal (and optionally a task)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    pub goal_id: String,
    pub task_id: Option<String>,
    pub title: String,
    pub content: String,
    pub source: KnowledgeSource,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeEntry {
    /// Build the knowledge record for a finding
    pub fn from_finding(finding: &ResearchFinding, goal_id: &str, task_id: Option<&str>) -> Self {
        debug!(finding_id = %finding.id, %goal_id, "KnowledgeEntry::from_finding: called");
        Self {
            id: generate_id("knowledge", &finding.query),
            goal_id: goal_id.to_string(),
            task_id: task_id.map(str::to_string),
            title: finding.query.clone(),
            content: finding.result.clone(),
            source: KnowledgeSource::Research,
            created_at: finding.timestamp,
        }
    }
}
