//! Plan generation and progress evaluation
//!
//! Both run one structured completion and decode it through the repair step.

use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use crate::decode::decode;
use crate::domain::{GeneratedPlan, Goal, GoalTask, OnboardingAnswers, Personality, ProgressEvaluation};
use crate::error::{PipelineError, PipelineResult};
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompts::PromptLibrary;

const PLAN_TEMPERATURE: f32 = 0.7;
const PLAN_MAX_TOKENS: u32 = 4096;
const EVALUATION_TEMPERATURE: f32 = 0.3;
const EVALUATION_MAX_TOKENS: u32 = 1024;

/// Evaluation as the model writes it; the score may be fractional or out of range
#[derive(Debug, Deserialize)]
struct RawEvaluation {
    score: f64,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    suggestions: Vec<String>,
}

pub struct PlanGenerator {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
}

impl PlanGenerator {
    pub fn new(client: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>) -> Self {
        Self { client, prompts }
    }

    /// Generate milestones and first-week tasks for a new goal
    pub async fn generate_plan(
        &self,
        goal: &Goal,
        onboarding: &OnboardingAnswers,
        personality: Personality,
    ) -> PipelineResult<GeneratedPlan> {
        debug!(goal_id = %goal.id, "generate_plan: called");
        if goal.title.trim().is_empty() {
            return Err(PipelineError::InvalidInput("goal title is empty".to_string()));
        }

        let pair = self
            .prompts
            .render(
                "plan",
                &json!({
                    "goal": goal,
                    "skills": goal.skills,
                    "experience": onboarding.experience.as_str(),
                    "available_days": onboarding.available_days.join(", "),
                    "concerns": onboarding.concerns.join("; "),
                    "tone": personality.tone(),
                }),
            )
            .map_err(PipelineError::prompt)?;

        let request = CompletionRequest::new(pair.system, pair.user)
            .with_temperature(PLAN_TEMPERATURE)
            .with_max_tokens(PLAN_MAX_TOKENS)
            .structured();
        let result = self.client.complete(request).await?;

        let mut plan: GeneratedPlan = decode(&result.text)?;
        plan.milestones.retain(|m| !m.title.trim().is_empty());
        plan.first_week_tasks.retain(|t| !t.title.trim().is_empty());

        if plan.milestones.is_empty() {
            return Err(PipelineError::InvalidOutput("plan has no milestones".to_string()));
        }
        if plan.first_week_tasks.is_empty() {
            return Err(PipelineError::InvalidOutput("plan has no first-week tasks".to_string()));
        }

        info!(
            goal_id = %goal.id,
            milestones = plan.milestones.len(),
            tasks = plan.first_week_tasks.len(),
            "Plan generated"
        );
        Ok(plan)
    }

    /// Score progress on a goal from its task list
    pub async fn evaluate(
        &self,
        goal: &Goal,
        tasks: &[GoalTask],
        personality: Personality,
    ) -> PipelineResult<ProgressEvaluation> {
        debug!(goal_id = %goal.id, task_count = tasks.len(), "evaluate: called");
        let completed = tasks.iter().filter(|t| t.completed).count();

        let pair = self
            .prompts
            .render(
                "evaluation",
                &json!({
                    "goal": goal,
                    "tasks": tasks,
                    "completed": completed,
                    "total": tasks.len(),
                    "tone": personality.tone(),
                }),
            )
            .map_err(PipelineError::prompt)?;

        let request = CompletionRequest::new(pair.system, pair.user)
            .with_temperature(EVALUATION_TEMPERATURE)
            .with_max_tokens(EVALUATION_MAX_TOKENS)
            .structured();
        let result = self.client.complete(request).await?;

        let raw: RawEvaluation = decode(&result.text)?;
        let summary = raw.summary.trim().to_string();
        if summary.is_empty() || !raw.score.is_finite() {
            return Err(PipelineError::InvalidOutput("evaluation is missing a score or summary".to_string()));
        }

        Ok(ProgressEvaluation {
            score: raw.score.round().clamp(0.0, 100.0) as u8,
            summary,
            suggestions: raw
                .suggestions
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExperienceLevel;
    use crate::llm::client::mock::MockLlmClient;

    fn goal() -> Goal {
        let mut goal = Goal {
            id: "goal-1".to_string(),
            title: "Run a half marathon".to_string(),
            description: "Finish under two hours".to_string(),
            daily_minutes: Some(45),
            ..Goal::default()
        };
        goal.skills.insert("running".to_string(), 2);
        goal
    }

    fn generator(client: Arc<MockLlmClient>) -> PlanGenerator {
        PlanGenerator::new(client, Arc::new(PromptLibrary::embedded_only()))
    }

    const PLAN: &str = r#"Here is your plan:
```json
{
  "summary": "Build up slowly.",
  "milestones": [{"title": "Run 5k", "description": "", "targetWeek": 3}],
  "firstWeekTasks": [
    {"title": "Easy 20 minute jog", "estimatedMinutes": 20, "dayOffset": 0, "checklist": ["Warm up", "Jog"]},
    {"title": " ", "estimatedMinutes": 5},
  ]
}
```"#;

    #[tokio::test]
    async fn test_generate_plan() {
        let client = Arc::new(MockLlmClient::texts([PLAN]));
        let onboarding = OnboardingAnswers {
            experience: ExperienceLevel::Beginner,
            available_days: vec!["monday".to_string(), "thursday".to_string()],
            concerns: vec!["knee pain".to_string()],
        };

        let plan = generator(client.clone())
            .generate_plan(&goal(), &onboarding, Personality::Coach)
            .await
            .unwrap();

        assert_eq!(plan.milestones[0].target_week, Some(3));
        assert_eq!(plan.first_week_tasks.len(), 1);
        assert_eq!(plan.first_week_tasks[0].checklist, vec!["Warm up", "Jog"]);

        let request = &client.requests()[0];
        assert!(request.require_structured_output);
        assert!(request.user_prompt.contains("Run a half marathon"));
        assert!(request.user_prompt.contains("Daily time budget: 45 minutes"));
        assert!(request.user_prompt.contains("- running: 2/5"));
        assert!(request.user_prompt.contains("Available days: monday, thursday"));
        assert!(request.user_prompt.contains("knee pain"));
        assert!(request.system_prompt.contains(Personality::Coach.tone()));
    }

    #[tokio::test]
    async fn test_plan_without_tasks_is_invalid() {
        let client = Arc::new(MockLlmClient::texts([
            r#"{"summary": "x", "milestones": [{"title": "m"}], "firstWeekTasks": []}"#,
        ]));
        let err = generator(client)
            .generate_plan(&goal(), &OnboardingAnswers::default(), Personality::Zen)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidOutput(_)));
    }

    #[tokio::test]
    async fn test_undecodable_plan_keeps_raw_text() {
        let client = Arc::new(MockLlmClient::texts(["I cannot make a plan right now."]));
        let err = generator(client)
            .generate_plan(&goal(), &OnboardingAnswers::default(), Personality::Zen)
            .await
            .unwrap_err();
        match err {
            PipelineError::Decode(e) => assert_eq!(e.raw, "I cannot make a plan right now."),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_goal_title_rejected() {
        let client = Arc::new(MockLlmClient::new(vec![]));
        let err = generator(client.clone())
            .generate_plan(&Goal::default(), &OnboardingAnswers::default(), Personality::Coach)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_evaluate_clamps_score() {
        let client = Arc::new(MockLlmClient::texts([
            r#"{"score": 134.6, "summary": "Ahead of schedule", "suggestions": ["Rest", ""]}"#,
            r#"{"score": -3, "summary": "Not started"}"#,
        ]));
        let generator = generator(client.clone());
        let tasks = vec![
            GoalTask {
                id: "t1".to_string(),
                goal_id: "goal-1".to_string(),
                title: "Jog".to_string(),
                completed: true,
                ..GoalTask::default()
            },
            GoalTask {
                id: "t2".to_string(),
                goal_id: "goal-1".to_string(),
                title: "Stretch".to_string(),
                ..GoalTask::default()
            },
        ];

        let high = generator.evaluate(&goal(), &tasks, Personality::Coach).await.unwrap();
        assert_eq!(high.score, 100);
        assert_eq!(high.suggestions, vec!["Rest"]);

        let low = generator.evaluate(&goal(), &tasks, Personality::Coach).await.unwrap();
        assert_eq!(low.score, 0);
        assert!(low.suggestions.is_empty());

        let prompt = &client.requests()[0].user_prompt;
        assert!(prompt.contains("Completed 1 of 2 tasks."));
        assert!(prompt.contains("- [x] Jog"));
        assert!(prompt.contains("- [ ] Stretch"));
    }
}
