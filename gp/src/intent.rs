//! Intent classification
//!
//! One short, low-temperature completion maps a free-text message onto a
//! closed set of intents. Anything outside that set, including an upstream
//! failure, resolves to `TaskHelp`.

use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::TaskContext;
use crate::llm::{CompletionRequest, LlmClient, ModelTier};
use crate::prompts::PromptLibrary;

const CLASSIFY_TEMPERATURE: f32 = 0.1;
const CLASSIFY_MAX_TOKENS: u32 = 20;

/// What the user wants from a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    ResearchRequest,
    TaskHelp,
    Brainstorming,
    StatusUpdate,
}

impl Intent {
    /// Parse a model label; `None` for anything outside the closed set
    ///
    /// Case, quoting, separators and trailing punctuation are ignored, so
    /// `research_request`, `"researchRequest"` and `Research request.` all match.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "researchrequest" => Some(Self::ResearchRequest),
            "taskhelp" => Some(Self::TaskHelp),
            "brainstorming" => Some(Self::Brainstorming),
            "statusupdate" => Some(Self::StatusUpdate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResearchRequest => "research_request",
            Self::TaskHelp => "task_help",
            Self::Brainstorming => "brainstorming",
            Self::StatusUpdate => "status_update",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Single-shot intent classifier
pub struct IntentClassifier {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
}

impl IntentClassifier {
    pub fn new(client: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>) -> Self {
        Self { client, prompts }
    }

    /// Classify `message`; never fails
    pub async fn classify(&self, message: &str, context: Option<&TaskContext>) -> Intent {
        debug!(message_len = message.len(), "classify: called");
        let context = context.map(TaskContext::describe).unwrap_or_default();
        let pair = match self
            .prompts
            .render("intent", &json!({ "message": message, "context": context }))
        {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "classify: prompt render failed, falling back to task_help");
                return Intent::TaskHelp;
            }
        };

        let request = CompletionRequest::new(pair.system, pair.user)
            .with_tier(ModelTier::Fast)
            .with_temperature(CLASSIFY_TEMPERATURE)
            .with_max_tokens(CLASSIFY_MAX_TOKENS);

        match self.client.complete(request).await {
            Ok(result) => match Intent::from_label(&result.text) {
                Some(intent) => {
                    debug!(%intent, "classify: classified");
                    intent
                }
                None => {
                    warn!(label = %result.text, "classify: unrecognized label, falling back to task_help");
                    Intent::TaskHelp
                }
            },
            Err(e) => {
                warn!(error = %e, "classify: request failed, falling back to task_help");
                Intent::TaskHelp
            }
        }
    }
}
