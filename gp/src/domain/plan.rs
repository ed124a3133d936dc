//! Outbound plan structures produced by the planner

use serde::{Deserialize, Serialize};

/// A plan generated for a goal during onboarding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPlan {
    #[serde(default)]
    pub summary: String,
    pub milestones: Vec<Milestone>,
    #[serde(rename = "firstWeekTasks", alias = "first_week_tasks")]
    pub first_week_tasks: Vec<PlannedTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Week number (1-based) the milestone should be reached by
    #[serde(rename = "targetWeek", alias = "target_week", default)]
    pub target_week: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "estimatedMinutes", alias = "estimated_minutes", default)]
    pub estimated_minutes: Option<u32>,
    /// Day of the first week, 0 = today
    #[serde(rename = "dayOffset", alias = "day_offset", default)]
    pub day_offset: Option<u32>,
    #[serde(default)]
    pub checklist: Vec<String>,
}

/// Model-produced assessment of goal progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvaluation {
    /// 0..=100
    pub score: u8,
    pub summary: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}
