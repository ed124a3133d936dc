//! Conversation orchestrator
//!
//! Sequences classification, clarification, research and synthesis for one
//! conversation. Every operation takes `&mut self`, so an instance can never
//! have two upstream calls in flight; hosts sharing an orchestrator across
//! tasks wrap it in a mutex.
//!
//! States: `Idle -> Processing -> {AwaitingClarification, Idle}` and
//! `AwaitingClarification -> Processing -> Idle`.

use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ConversationConfig;
use crate::decode::decode;
use crate::domain::{
    ClarificationPair, Conversation, ConversationMessage, MessageRole, MessageTag, ResearchFinding, TaskContext,
};
use crate::error::{PipelineError, PipelineResult};
use crate::events::{EventBus, PipelineEvent};
use crate::intent::{Intent, IntentClassifier};
use crate::llm::{CompletionRequest, LlmClient, ModelTier};
use crate::prompts::PromptLibrary;
use crate::research::ResearchPipeline;

const CLARIFY_TEMPERATURE: f32 = 0.4;
const CLARIFY_MAX_TOKENS: u32 = 512;
const HELP_TEMPERATURE: f32 = 0.7;

/// Orchestrator lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrchestratorState {
    #[default]
    Idle,
    Processing,
    AwaitingClarification,
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::AwaitingClarification => "awaiting_clarification",
        };
        write!(f, "{}", s)
    }
}

/// What one `submit` or `provide_answers` call produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnOutcome {
    pub intent: Option<Intent>,
    /// The caller must answer `questions` via `provide_answers`
    pub requires_clarification: bool,
    pub questions: Vec<String>,
    /// Assistant reply for non-research intents
    pub reply: Option<String>,
    pub finding: Option<ResearchFinding>,
}

/// Research query waiting on clarification answers
#[derive(Debug, Clone)]
struct PendingResearch {
    query: String,
    questions: Vec<String>,
}

/// Model reply to the clarify prompt; a bare array is accepted too
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuestionsReply {
    Wrapped { questions: Vec<String> },
    Bare(Vec<String>),
}

impl QuestionsReply {
    fn into_questions(self) -> Vec<String> {
        match self {
            Self::Wrapped { questions } | Self::Bare(questions) => questions,
        }
    }
}

pub struct ConversationOrchestrator {
    client: Arc<dyn LlmClient>,
    classifier: IntentClassifier,
    research: Arc<ResearchPipeline>,
    prompts: Arc<PromptLibrary>,
    config: ConversationConfig,
    events: EventBus,
    context: Option<TaskContext>,
    conversation: Conversation,
    state: OrchestratorState,
    pending: Option<PendingResearch>,
}

impl ConversationOrchestrator {
    pub fn new(
        client: Arc<dyn LlmClient>,
        research: Arc<ResearchPipeline>,
        prompts: Arc<PromptLibrary>,
        config: ConversationConfig,
    ) -> Self {
        debug!(?config, "ConversationOrchestrator::new: called");
        Self {
            classifier: IntentClassifier::new(client.clone(), prompts.clone()),
            client,
            research,
            prompts,
            config,
            events: EventBus::default(),
            context: None,
            conversation: Conversation::new("conversation"),
            state: OrchestratorState::Idle,
            pending: None,
        }
    }

    /// Attach the goal/task this conversation is about
    pub fn with_context(mut self, context: TaskContext) -> Self {
        self.conversation = Conversation::new(&context.goal.title);
        self.context = Some(context);
        self
    }

    /// Emit transcript and research events on a shared bus
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn transcript(&self) -> &Conversation {
        &self.conversation
    }

    pub fn context(&self) -> Option<&TaskContext> {
        self.context.as_ref()
    }

    /// Questions the caller still has to answer, if any
    pub fn pending_questions(&self) -> Option<&[String]> {
        self.pending.as_ref().map(|p| p.questions.as_slice())
    }

    /// Handle a new user message
    ///
    /// Research requests stop at `AwaitingClarification` with a question
    /// list; every other intent is answered directly.
    pub async fn submit(&mut self, message: &str) -> PipelineResult<TurnOutcome> {
        debug!(state = %self.state, message_len = message.len(), "submit: called");
        match self.state {
            OrchestratorState::AwaitingClarification => {
                return Err(PipelineError::InvalidState(
                    "clarification answers are pending; answer them or reset".to_string(),
                ));
            }
            OrchestratorState::Processing => {
                // A previous turn was dropped mid-flight
                warn!("submit: previous turn was abandoned, discarding it");
                self.pending = None;
            }
            OrchestratorState::Idle => {}
        }

        let message = message.trim();
        if message.is_empty() {
            return Err(PipelineError::InvalidInput("message is empty".to_string()));
        }

        self.set_state(OrchestratorState::Processing);
        let intent = self.classifier.classify(message, self.context.as_ref()).await;
        info!(%intent, "submit: intent classified");

        // History excludes the message being answered
        let history = self.conversation.render_window(self.config.history_window);
        let tag = (intent == Intent::ResearchRequest).then_some(MessageTag::ResearchRequest);
        self.append(ConversationMessage::new(MessageRole::User, message, tag));

        let result = match intent {
            Intent::ResearchRequest => self.request_clarification(message).await,
            other => self.answer_directly(message, other, &history).await,
        };

        match result {
            Ok(mut outcome) => {
                outcome.intent = Some(intent);
                Ok(outcome)
            }
            Err(e) => Err(self.fail_turn(e)),
        }
    }

    /// Supply answers to the pending clarifying questions, in order
    pub async fn provide_answers(&mut self, answers: Vec<String>) -> PipelineResult<TurnOutcome> {
        debug!(state = %self.state, answer_count = answers.len(), "provide_answers: called");
        let pending = match (&self.state, &self.pending) {
            (OrchestratorState::AwaitingClarification, Some(pending)) => pending.clone(),
            _ => {
                return Err(PipelineError::InvalidState(format!(
                    "no clarification pending (state: {})",
                    self.state
                )));
            }
        };

        if answers.len() != pending.questions.len() {
            return Err(PipelineError::InvalidInput(format!(
                "expected {} answers, got {}",
                pending.questions.len(),
                answers.len()
            )));
        }

        self.set_state(OrchestratorState::Processing);
        let clarifications: Vec<ClarificationPair> = pending
            .questions
            .iter()
            .zip(answers)
            .map(|(q, a)| ClarificationPair::new(q.clone(), a.trim()))
            .collect();

        let answers_text = clarifications
            .iter()
            .map(|c| format!("{} {}", c.question, c.answer))
            .collect::<Vec<_>>()
            .join("\n");
        self.append(ConversationMessage::user(answers_text));

        let result = self
            .research
            .research(&pending.query, &clarifications, self.context.as_ref())
            .await;
        let finding = match result {
            Ok(finding) => finding,
            Err(e) => return Err(self.fail_turn(e)),
        };

        self.append(ConversationMessage::assistant(finding.result.clone(), MessageTag::ResearchResult));
        self.events.emit(PipelineEvent::ResearchCompleted {
            finding_id: finding.id.clone(),
            query: finding.query.clone(),
        });
        self.pending = None;
        self.set_state(OrchestratorState::Idle);

        Ok(TurnOutcome {
            intent: Some(Intent::ResearchRequest),
            finding: Some(finding),
            ..TurnOutcome::default()
        })
    }

    /// Discard any pending research query and return to `Idle`
    ///
    /// The transcript is kept.
    pub fn reset(&mut self) {
        debug!(state = %self.state, "reset: called");
        if self.pending.take().is_some() {
            info!("reset: discarded pending research query");
        }
        self.set_state(OrchestratorState::Idle);
    }

    async fn request_clarification(&mut self, query: &str) -> PipelineResult<TurnOutcome> {
        debug!(%query, "request_clarification: called");
        let questions = self.generate_questions(query).await?;

        let listing = questions
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{}. {}", i + 1, q))
            .collect::<Vec<_>>()
            .join("\n");
        self.append(ConversationMessage::system(listing, MessageTag::ClarifyingQuestion));

        self.pending = Some(PendingResearch {
            query: query.to_string(),
            questions: questions.clone(),
        });
        self.events.emit(PipelineEvent::ClarificationRequested {
            conversation_id: self.conversation.id().to_string(),
            questions: questions.clone(),
        });
        self.set_state(OrchestratorState::AwaitingClarification);

        Ok(TurnOutcome {
            requires_clarification: true,
            questions,
            ..TurnOutcome::default()
        })
    }

    async fn generate_questions(&self, query: &str) -> PipelineResult<Vec<String>> {
        let pair = self
            .prompts
            .render(
                "clarify",
                &json!({
                    "query": query,
                    "context": self.describe_context(),
                    "tone": self.tone(),
                    "min_questions": self.config.min_questions,
                    "max_questions": self.config.max_questions,
                }),
            )
            .map_err(PipelineError::prompt)?;

        let request = CompletionRequest::new(pair.system, pair.user)
            .with_temperature(CLARIFY_TEMPERATURE)
            .with_max_tokens(CLARIFY_MAX_TOKENS)
            .structured();
        let result = self.client.complete(request).await?;

        let mut questions: Vec<String> = decode::<QuestionsReply>(&result.text)?
            .into_questions()
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();
        questions.truncate(self.config.max_questions);

        if questions.len() < self.config.min_questions {
            return Err(PipelineError::InvalidOutput(format!(
                "expected at least {} clarifying questions, got {}",
                self.config.min_questions,
                questions.len()
            )));
        }
        debug!(count = questions.len(), "generate_questions: accepted");
        Ok(questions)
    }

    async fn answer_directly(&mut self, message: &str, intent: Intent, history: &str) -> PipelineResult<TurnOutcome> {
        debug!(%intent, "answer_directly: called");
        let pair = self
            .prompts
            .render(
                "task-help",
                &json!({
                    "message": message,
                    "history": history,
                    "context": self.describe_context(),
                    "tone": self.tone(),
                    "brainstorming": intent == Intent::Brainstorming,
                    "status_update": intent == Intent::StatusUpdate,
                }),
            )
            .map_err(PipelineError::prompt)?;

        let request = CompletionRequest::new(pair.system, pair.user).with_temperature(HELP_TEMPERATURE);
        let result = self.client.complete(request).await?;
        let reply = result.text.trim().to_string();
        if reply.is_empty() {
            return Err(PipelineError::InvalidOutput("assistant reply is empty".to_string()));
        }

        self.append(ConversationMessage::assistant(reply.clone(), MessageTag::GeneralHelp));
        self.set_state(OrchestratorState::Idle);

        Ok(TurnOutcome {
            reply: Some(reply),
            ..TurnOutcome::default()
        })
    }

    /// Record a visible failure, drop pending work and return to `Idle`
    fn fail_turn(&mut self, err: PipelineError) -> PipelineError {
        warn!(error = %err, "fail_turn: turn could not complete");
        self.append(ConversationMessage::system(
            format!("Could not complete this request: {}", err),
            MessageTag::Failure,
        ));
        self.pending = None;
        self.set_state(OrchestratorState::Idle);
        err
    }

    fn append(&mut self, message: ConversationMessage) {
        let conversation_id = self.conversation.id().to_string();
        let stored = self.conversation.push(message);
        let event = PipelineEvent::MessageAppended {
            conversation_id,
            message_id: stored.id().to_string(),
            role: stored.role(),
            tag: stored.tag(),
        };
        self.events.emit(event);
    }

    fn set_state(&mut self, state: OrchestratorState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "set_state: transition");
            self.state = state;
        }
    }

    fn describe_context(&self) -> String {
        self.context.as_ref().map(TaskContext::describe).unwrap_or_default()
    }

    fn tone(&self) -> &'static str {
        self.context.as_ref().map(|c| c.personality.tone()).unwrap_or_default()
    }
}
