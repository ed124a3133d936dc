//! Completion request/response types
//!
//! These model an OpenAI-compatible chat-completions exchange reduced to what
//! the orchestration core needs: one system prompt, one user prompt.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which configured model a request runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Small, cheap model (intent classification)
    Fast,
    /// General model (planning, help, reports)
    #[default]
    Standard,
    /// Tool-enabled variant with built-in web search (research)
    Search,
}

/// A completion request - everything needed for one model call
///
/// Immutable value constructed per call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Ask the upstream for `response_format: {type: "json_object"}`
    pub require_structured_output: bool,
    pub model_tier: ModelTier,
    /// Tool definitions forwarded verbatim (empty for most requests)
    pub tools: Vec<serde_json::Value>,
}

impl CompletionRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        debug!("CompletionRequest::new: called");
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: 0.7,
            max_tokens: None,
            require_structured_output: false,
            model_tier: ModelTier::Standard,
            tools: Vec::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_tier(mut self, tier: ModelTier) -> Self {
        self.model_tier = tier;
        self
    }

    pub fn with_tools(mut self, tools: Vec<serde_json::Value>) -> Self {
        self.tools = tools;
        self
    }

    /// Request machine-parseable JSON output
    pub fn structured(mut self) -> Self {
        self.require_structured_output = true;
        self
    }
}

/// Token accounting reported by the upstream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Raw text payload of a completion plus usage metadata
///
/// Ephemeral: never persisted beyond the call that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResult {
    pub text: String,
    pub usage: TokenUsage,
    pub model: Option<String>,
}

impl CompletionResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: TokenUsage::default(),
            model: None,
        }
    }
}

// Wire types for the chat-completions response

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder_defaults() {
        let req = CompletionRequest::new("sys", "user");
        assert_eq!(req.model_tier, ModelTier::Standard);
        assert!(!req.require_structured_output);
        assert!(req.max_tokens.is_none());
        assert!(req.tools.is_empty());
    }

    #[test]
    fn test_request_builder_chain() {
        let req = CompletionRequest::new("sys", "user")
            .with_temperature(0.1)
            .with_max_tokens(20)
            .with_tier(ModelTier::Fast)
            .structured();
        assert_eq!(req.temperature, 0.1);
        assert_eq!(req.max_tokens, Some(20));
        assert_eq!(req.model_tier, ModelTier::Fast);
        assert!(req.require_structured_output);
    }

    #[test]
    fn test_chat_response_parses_without_usage() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#;
        let resp: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.choices[0].message.content.as_deref(), Some("hi"));
        assert!(resp.usage.is_none());
    }
}
