//! Inbound collaborator records
//!
//! Goals, tasks and onboarding answers are owned by the UI/persistence layer.
//! The core only reads them to build prompts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A user goal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Minutes per day the user can spend on this goal
    #[serde(default)]
    pub daily_minutes: Option<u32>,
    /// Self-assessed skill levels (skill -> 1..=5)
    #[serde(default)]
    pub skills: BTreeMap<String, u8>,
}

/// A task belonging to a goal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalTask {
    pub id: String,
    pub goal_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub estimated_minutes: Option<u32>,
    #[serde(default)]
    pub completed: bool,
}

/// How experienced the user says they are with the goal's domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

/// Answers collected by the onboarding screens
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnboardingAnswers {
    #[serde(default)]
    pub experience: ExperienceLevel,
    /// Days of the week the user is available, e.g. "monday"
    #[serde(default)]
    pub available_days: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
}

/// Coach personality used to pick the tone of user-facing text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Personality {
    #[default]
    Coach,
    Friend,
    DrillSergeant,
    Zen,
}

impl Personality {
    /// One-line tone instruction injected into user-facing prompts
    pub fn tone(&self) -> &'static str {
        match self {
            Self::Coach => "Speak like an encouraging, practical coach: direct, warm, focused on the next step.",
            Self::Friend => "Speak like a supportive friend: casual, upbeat, never preachy.",
            Self::DrillSergeant => "Speak like a tough-love drill sergeant: short sentences, no excuses, high energy.",
            Self::Zen => "Speak like a calm mentor: patient, reflective, focused on steady progress.",
        }
    }
}

/// Task/goal context forwarded into prompts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskContext {
    pub goal: Goal,
    #[serde(default)]
    pub task: Option<GoalTask>,
    #[serde(default)]
    pub personality: Personality,
}

impl TaskContext {
    pub fn new(goal: Goal) -> Self {
        Self {
            goal,
            task: None,
            personality: Personality::default(),
        }
    }

    pub fn with_task(mut self, task: GoalTask) -> Self {
        self.task = Some(task);
        self
    }

    pub fn with_personality(mut self, personality: Personality) -> Self {
        self.personality = personality;
        self
    }

    pub fn goal_id(&self) -> &str {
        &self.goal.id
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task.as_ref().map(|t| t.id.as_str())
    }

    /// Plain-text summary used by prompt templates
    pub fn describe(&self) -> String {
        let mut out = format!("Goal: {}", self.goal.title);
        if !self.goal.description.is_empty() {
            out.push_str(&format!("\nGoal description: {}", self.goal.description));
        }
        if let Some(minutes) = self.goal.daily_minutes {
            out.push_str(&format!("\nTime budget: {} minutes per day", minutes));
        }
        if !self.goal.skills.is_empty() {
            let skills = self
                .goal
                .skills
                .iter()
                .map(|(name, level)| format!("{} ({}/5)", name, level))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!("\nSkills: {}", skills));
        }
        if let Some(task) = &self.task {
            out.push_str(&format!("\nCurrent task: {}", task.title));
            if !task.description.is_empty() {
                out.push_str(&format!("\nTask description: {}", task.description));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal() -> Goal {
        Goal {
            id: "goal-1".to_string(),
            title: "Launch my app".to_string(),
            description: "A habit tracker for iOS".to_string(),
            daily_minutes: Some(45),
            skills: BTreeMap::from([("swift".to_string(), 3)]),
        }
    }

    #[test]
    fn test_describe_includes_goal_and_task() {
        let ctx = TaskContext::new(goal()).with_task(GoalTask {
            id: "task-1".to_string(),
            goal_id: "goal-1".to_string(),
            title: "Decide pricing".to_string(),
            ..Default::default()
        });
        let text = ctx.describe();
        assert!(text.contains("Goal: Launch my app"));
        assert!(text.contains("45 minutes per day"));
        assert!(text.contains("swift (3/5)"));
        assert!(text.contains("Current task: Decide pricing"));
        assert_eq!(ctx.task_id(), Some("task-1"));
    }

    #[test]
    fn test_personality_serde_kebab_case() {
        let p: Personality = serde_json::from_str("\"drill-sergeant\"").unwrap();
        assert_eq!(p, Personality::DrillSergeant);
        assert!(p.tone().contains("drill sergeant"));
    }
}
