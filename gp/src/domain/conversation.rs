//! Conversation transcript types
//!
//! A conversation is an ordered, append-only list of messages. Messages are
//! never edited after insertion; a correction is a new message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::id::generate_id;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// What a message represents in the research / help flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageTag {
    /// System message listing clarifying questions
    ClarifyingQuestion,
    /// User message classified as a research request
    ResearchRequest,
    /// Assistant message carrying a synthesized research result
    ResearchResult,
    /// Assistant reply to a task-help / brainstorming / status message
    GeneralHelp,
    /// System message recording that a turn could not be completed
    Failure,
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    id: String,
    role: MessageRole,
    content: String,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<MessageTag>,
}

impl ConversationMessage {
    /// Create a message with a fresh ID and the current timestamp
    pub fn new(role: MessageRole, content: impl Into<String>, tag: Option<MessageTag>) -> Self {
        let content = content.into();
        debug!(%role, ?tag, content_len = content.len(), "ConversationMessage::new: called");
        Self {
            id: generate_id("msg", &role.to_string()),
            role,
            content,
            timestamp: Utc::now(),
            tag,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content, None)
    }

    pub fn assistant(content: impl Into<String>, tag: MessageTag) -> Self {
        Self::new(MessageRole::Assistant, content, Some(tag))
    }

    pub fn system(content: impl Into<String>, tag: MessageTag) -> Self {
        Self::new(MessageRole::System, content, Some(tag))
    }

    /// Return a copy of this message carrying `tag`
    ///
    /// Only usable before insertion: the transcript hands out shared
    /// references, so inserted messages cannot be retagged.
    pub fn tagged(mut self, tag: MessageTag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> MessageRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn tag(&self) -> Option<MessageTag> {
        self.tag
    }
}

/// Ordered, append-only transcript owned by one orchestrator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    id: String,
    messages: Vec<ConversationMessage>,
}

impl Conversation {
    pub fn new(title: &str) -> Self {
        debug!(%title, "Conversation::new: called");
        Self {
            id: generate_id("conv", title),
            messages: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Append a message and return a reference to the stored copy
    pub fn push(&mut self, message: ConversationMessage) -> &ConversationMessage {
        debug!(conversation_id = %self.id, message_id = %message.id, "Conversation::push: called");
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationMessage> {
        self.messages.last()
    }

    /// The trailing `n` messages, oldest first
    pub fn window(&self, n: usize) -> &[ConversationMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Count messages carrying `tag`
    pub fn count_tagged(&self, tag: MessageTag) -> usize {
        self.messages.iter().filter(|m| m.tag == Some(tag)).count()
    }

    /// Render the trailing `n` messages as `role: content` lines for prompts
    pub fn render_window(&self, n: usize) -> String {
        self.window(n)
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
