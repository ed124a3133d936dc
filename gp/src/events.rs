//! Event Bus - pub/sub for pipeline activity
//!
//! The orchestrator and work queue emit events here; the UI layer subscribes
//! and owns its own dispatch. Events are fire-and-forget.

use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::{MessageRole, MessageTag, WorkItemStatus, WorkItemType};

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Something the UI layer may want to react to
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A message was appended to a conversation transcript
    MessageAppended {
        conversation_id: String,
        message_id: String,
        role: MessageRole,
        tag: Option<MessageTag>,
    },
    /// The orchestrator is waiting for clarification answers
    ClarificationRequested {
        conversation_id: String,
        questions: Vec<String>,
    },
    /// A research cycle produced a finding
    ResearchCompleted { finding_id: String, query: String },
    /// A work item entered the queue
    WorkItemEnqueued {
        item_id: String,
        item_type: WorkItemType,
    },
    /// A work item changed status
    WorkItemStatusChanged {
        item_id: String,
        status: WorkItemStatus,
    },
}

impl PipelineEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MessageAppended { .. } => "message_appended",
            Self::ClarificationRequested { .. } => "clarification_requested",
            Self::ResearchCompleted { .. } => "research_completed",
            Self::WorkItemEnqueued { .. } => "work_item_enqueued",
            Self::WorkItemStatusChanged { .. } => "work_item_status_changed",
        }
    }
}

/// Broadcast bus shared by orchestrators and queues
///
/// Clones share the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no subscribers the event is dropped. If the channel is
    /// full, the oldest events are dropped.
    pub fn emit(&self, event: PipelineEvent) {
        debug!(event_type = event.event_type(), "EventBus::emit");
        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    /// Receive every event emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}
