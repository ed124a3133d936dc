//! Morning briefing
//!
//! A short generated message about today's work. When the upstream call
//! fails the briefing is built locally and marked as a fallback, so the
//! caller always has something to show.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{Goal, GoalTask, Personality};
use crate::error::{PipelineError, PipelineResult};
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompts::PromptLibrary;

const BRIEFING_TEMPERATURE: f32 = 0.8;
const BRIEFING_MAX_TOKENS: u32 = 300;

/// Where a briefing's text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BriefingSource {
    Generated,
    /// Built locally after the upstream call failed
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Briefing {
    pub message: String,
    pub source: BriefingSource,
    pub created_at: DateTime<Utc>,
}

impl Briefing {
    pub fn is_fallback(&self) -> bool {
        self.source == BriefingSource::Fallback
    }
}

pub struct BriefingGenerator {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
}

impl BriefingGenerator {
    pub fn new(client: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>) -> Self {
        Self { client, prompts }
    }

    /// Generate today's briefing; never fails
    pub async fn generate(&self, goals: &[Goal], today: &[GoalTask], personality: Personality) -> Briefing {
        debug!(goal_count = goals.len(), task_count = today.len(), "generate: called");
        match self.generated(goals, today, personality).await {
            Ok(message) => Briefing {
                message,
                source: BriefingSource::Generated,
                created_at: Utc::now(),
            },
            Err(e) => {
                warn!(error = %e, "generate: using fallback briefing");
                Briefing {
                    message: fallback_message(goals, today),
                    source: BriefingSource::Fallback,
                    created_at: Utc::now(),
                }
            }
        }
    }

    async fn generated(&self, goals: &[Goal], today: &[GoalTask], personality: Personality) -> PipelineResult<String> {
        let goal_titles: Vec<&str> = goals.iter().map(|g| g.title.as_str()).collect();
        let task_titles: Vec<&str> = today.iter().map(|t| t.title.as_str()).collect();
        let pair = self
            .prompts
            .render(
                "briefing",
                &json!({
                    "goals": goal_titles,
                    "tasks": task_titles,
                    "tone": personality.tone(),
                }),
            )
            .map_err(PipelineError::prompt)?;

        let request = CompletionRequest::new(pair.system, pair.user)
            .with_temperature(BRIEFING_TEMPERATURE)
            .with_max_tokens(BRIEFING_MAX_TOKENS);
        let result = self.client.complete(request).await?;

        let message = result.text.trim();
        if message.is_empty() {
            return Err(PipelineError::InvalidOutput("briefing is empty".to_string()));
        }
        Ok(message.to_string())
    }
}

/// Locally built briefing used when generation fails
pub fn fallback_message(goals: &[Goal], today: &[GoalTask]) -> String {
    let open: Vec<&str> = today
        .iter()
        .filter(|t| !t.completed)
        .map(|t| t.title.as_str())
        .collect();

    let mut message = String::from("Good morning!");
    match open.len() {
        0 => message.push_str(" Nothing is scheduled today, so pick one small step toward your goal."),
        1 => message.push_str(&format!(" Today's task: {}.", open[0])),
        n => message.push_str(&format!(" You have {} tasks today: {}.", n, open.join(", "))),
    }
    if let Some(goal) = goals.first() {
        message.push_str(&format!(" Every step moves \"{}\" forward.", goal.title));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::RequestError;
    use crate::llm::client::mock::MockLlmClient;

    fn task(title: &str, completed: bool) -> GoalTask {
        GoalTask {
            id: title.to_lowercase(),
            goal_id: "goal-1".to_string(),
            title: title.to_string(),
            completed,
            ..GoalTask::default()
        }
    }

    fn goals() -> Vec<Goal> {
        vec![Goal {
            id: "goal-1".to_string(),
            title: "Learn Spanish".to_string(),
            ..Goal::default()
        }]
    }

    fn generator(client: Arc<MockLlmClient>) -> BriefingGenerator {
        BriefingGenerator::new(client, Arc::new(PromptLibrary::embedded_only()))
    }

    #[tokio::test]
    async fn test_generated_briefing() {
        let client = Arc::new(MockLlmClient::texts(["Buenos dias! Review 20 flashcards today."]));
        let briefing = generator(client.clone())
            .generate(&goals(), &[task("Flashcards", false)], Personality::Friend)
            .await;

        assert_eq!(briefing.source, BriefingSource::Generated);
        assert!(!briefing.is_fallback());
        assert_eq!(briefing.message, "Buenos dias! Review 20 flashcards today.");

        let request = &client.requests()[0];
        assert!(request.user_prompt.contains("Goal: Learn Spanish"));
        assert!(request.user_prompt.contains("- Flashcards"));
    }

    #[tokio::test]
    async fn test_failure_uses_labeled_fallback() {
        let client = Arc::new(MockLlmClient::new(vec![Err(RequestError::Timeout(
            std::time::Duration::from_secs(60),
        ))]));
        let today = [task("Flashcards", false), task("Podcast", false), task("Done already", true)];

        let briefing = generator(client).generate(&goals(), &today, Personality::Coach).await;

        assert!(briefing.is_fallback());
        assert_eq!(
            briefing.message,
            "Good morning! You have 2 tasks today: Flashcards, Podcast. Every step moves \"Learn Spanish\" forward."
        );
    }

    #[tokio::test]
    async fn test_generation_errors_stay_typed() {
        let client = Arc::new(MockLlmClient::texts(["   "]));
        client.push_error(RequestError::UpstreamError {
            status: 503,
            body: "unavailable".to_string(),
        });
        let generator = generator(client);

        let err = generator.generated(&goals(), &[], Personality::Zen).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidOutput(_)));

        let err = generator.generated(&goals(), &[], Personality::Zen).await.unwrap_err();
        assert!(matches!(err, PipelineError::Request(ref e) if e.status() == Some(503)));
    }

    #[test]
    fn test_fallback_message_variants() {
        assert_eq!(
            fallback_message(&[], &[]),
            "Good morning! Nothing is scheduled today, so pick one small step toward your goal."
        );
        assert_eq!(
            fallback_message(&[], &[task("Read", false)]),
            "Good morning! Today's task: Read."
        );
    }
}
