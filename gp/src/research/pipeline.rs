//! Research pipeline
//!
//! Runs one search-augmented completion over the query, the clarification
//! answers and the task context, then records the synthesized answer as a
//! `ResearchFinding` and a knowledge-base entry. Nothing is created unless
//! synthesis succeeds.

use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::knowledge::KnowledgeStore;
use crate::config::ResearchConfig;
use crate::domain::{ClarificationPair, KnowledgeEntry, ResearchFinding, TaskContext};
use crate::error::{PipelineError, PipelineResult};
use crate::llm::{CompletionRequest, LlmClient, ModelTier};
use crate::prompts::PromptLibrary;

const RESEARCH_TEMPERATURE: f32 = 0.3;

pub struct ResearchPipeline {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    store: Arc<dyn KnowledgeStore>,
    config: ResearchConfig,
}

impl ResearchPipeline {
    pub fn new(
        client: Arc<dyn LlmClient>,
        prompts: Arc<PromptLibrary>,
        store: Arc<dyn KnowledgeStore>,
        config: ResearchConfig,
    ) -> Self {
        Self {
            client,
            prompts,
            store,
            config,
        }
    }

    /// Research `query` and persist the result
    ///
    /// On any failure no finding is returned and nothing is saved.
    pub async fn research(
        &self,
        query: &str,
        clarifications: &[ClarificationPair],
        context: Option<&TaskContext>,
    ) -> PipelineResult<ResearchFinding> {
        debug!(%query, clarification_count = clarifications.len(), "research: called");
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::InvalidInput("research query is empty".to_string()));
        }

        let pair = self
            .prompts
            .render(
                "research",
                &json!({
                    "query": query,
                    "clarifications": clarifications,
                    "context": context.map(TaskContext::describe).unwrap_or_default(),
                }),
            )
            .map_err(PipelineError::prompt)?;

        let request = CompletionRequest::new(pair.system, pair.user)
            .with_tier(ModelTier::Search)
            .with_temperature(RESEARCH_TEMPERATURE)
            .with_max_tokens(self.config.max_tokens);

        let result = self.client.complete(request).await.map_err(|e| {
            warn!(error = %e, "research: synthesis request failed");
            PipelineError::from(e)
        })?;

        let synthesis = result.text.trim();
        if synthesis.is_empty() {
            return Err(PipelineError::InvalidOutput("research synthesis is empty".to_string()));
        }

        let finding = ResearchFinding::new(query, clarifications.to_vec(), synthesis, self.config.auto_save);

        if self.config.auto_save {
            let goal_id = context.map(TaskContext::goal_id).unwrap_or_default();
            let task_id = context.and_then(TaskContext::task_id);
            let entry = KnowledgeEntry::from_finding(&finding, goal_id, task_id);
            self.store.save(entry).await.map_err(|e| {
                warn!(error = %e, "research: knowledge store rejected entry");
                PipelineError::Knowledge(e.to_string())
            })?;
        } else {
            debug!("research: auto-save disabled");
        }

        info!(finding_id = %finding.id, auto_saved = finding.auto_saved, "research: finding created");
        Ok(finding)
    }
}
