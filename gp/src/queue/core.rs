//! Work queue implementation

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::dispatch::build_request;
use super::recovery::{RecoveryStats, recover_items};
use crate::config::QueueConfig;
use crate::domain::{AIWorkItem, WorkItemStatus};
use crate::error::{PipelineError, PipelineResult};
use crate::events::{EventBus, PipelineEvent};
use crate::llm::LlmClient;
use crate::prompts::PromptLibrary;

/// Items processed by one `process_pending` pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    pub completed: Vec<String>,
    pub failed: Vec<String>,
}

impl ProcessReport {
    pub fn processed(&self) -> usize {
        self.completed.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed() == 0
    }
}

/// Internal state protected by mutex
#[derive(Default)]
struct QueueInner {
    /// Items in enqueue order
    items: Vec<AIWorkItem>,
}

impl QueueInner {
    fn find(&self, id: &str) -> Option<&AIWorkItem> {
        self.items.iter().find(|i| i.id == id)
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut AIWorkItem> {
        self.items.iter_mut().find(|i| i.id == id)
    }
}

/// Background queue of AI work items
///
/// Items move `pending -> in_progress -> {completed, failed}` and are handed
/// to the host with `take_terminal` once finished. Processing is single
/// flight: only one `process_pending` pass runs at a time per queue.
pub struct WorkQueue {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    config: QueueConfig,
    events: EventBus,
    inner: Mutex<QueueInner>,
    /// Held for the duration of a processing pass
    worker: Mutex<()>,
}

impl WorkQueue {
    pub fn new(client: Arc<dyn LlmClient>, prompts: Arc<PromptLibrary>, config: QueueConfig) -> Self {
        debug!(?config, "WorkQueue::new: called");
        Self {
            client,
            prompts,
            events: EventBus::new(config.event_capacity),
            config,
            inner: Mutex::new(QueueInner::default()),
            worker: Mutex::new(()),
        }
    }

    /// Emit status changes on a shared bus
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Add a pending item and return its ID
    pub async fn enqueue(&self, item: AIWorkItem) -> PipelineResult<String> {
        debug!(id = %item.id, item_type = %item.item_type, "enqueue: called");
        if item.status() != WorkItemStatus::Pending {
            return Err(PipelineError::InvalidInput(format!(
                "only pending items can be enqueued (item {} is {})",
                item.id,
                item.status()
            )));
        }

        let mut inner = self.inner.lock().await;
        if inner.find(&item.id).is_some() {
            return Err(PipelineError::InvalidInput(format!("item {} is already queued", item.id)));
        }

        let id = item.id.clone();
        let item_type = item.item_type;
        inner.items.push(item);
        drop(inner);

        info!(%id, %item_type, "Work item enqueued");
        self.events.emit(PipelineEvent::WorkItemEnqueued {
            item_id: id.clone(),
            item_type,
        });
        Ok(id)
    }

    /// Load items persisted by a previous process, in any status
    ///
    /// Items whose ID is already present are skipped. Returns the number added.
    pub async fn restore(&self, items: Vec<AIWorkItem>) -> usize {
        debug!(count = items.len(), "restore: called");
        let mut inner = self.inner.lock().await;
        let mut added = 0;
        for item in items {
            if inner.find(&item.id).is_some() {
                debug!(id = %item.id, "restore: duplicate id, skipping");
                continue;
            }
            inner.items.push(item);
            added += 1;
        }
        added
    }

    pub async fn status(&self, id: &str) -> Option<WorkItemStatus> {
        self.inner.lock().await.find(id).map(AIWorkItem::status)
    }

    pub async fn get(&self, id: &str) -> Option<AIWorkItem> {
        self.inner.lock().await.find(id).cloned()
    }

    /// Snapshot of every held item in enqueue order
    pub async fn items(&self) -> Vec<AIWorkItem> {
        self.inner.lock().await.items.clone()
    }

    pub async fn pending_count(&self) -> usize {
        self.inner
            .lock()
            .await
            .items
            .iter()
            .filter(|i| i.status() == WorkItemStatus::Pending)
            .count()
    }

    /// Remove and return every completed or failed item
    pub async fn take_terminal(&self) -> Vec<AIWorkItem> {
        let mut inner = self.inner.lock().await;
        let (terminal, live): (Vec<_>, Vec<_>) = std::mem::take(&mut inner.items)
            .into_iter()
            .partition(|i| i.status().is_terminal());
        inner.items = live;
        debug!(count = terminal.len(), "take_terminal: handing off items");
        terminal
    }

    /// Process the items that are pending when the pass starts
    ///
    /// Items enqueued during the pass wait for the next one. If a pass is
    /// already running, returns an empty report without doing anything.
    pub async fn process_pending(&self) -> ProcessReport {
        debug!("process_pending: called");
        let Ok(_worker) = self.worker.try_lock() else {
            debug!("process_pending: another pass is running");
            return ProcessReport::default();
        };

        let pending: Vec<String> = {
            let inner = self.inner.lock().await;
            inner
                .items
                .iter()
                .filter(|i| i.status() == WorkItemStatus::Pending)
                .map(|i| i.id.clone())
                .collect()
        };
        debug!(count = pending.len(), "process_pending: snapshot taken");

        let mut report = ProcessReport::default();
        for id in pending {
            let Some(item) = self.begin(&id).await else {
                continue;
            };

            let outcome = self.run(&item).await;
            match self.finish(&id, outcome).await {
                Some(WorkItemStatus::Completed) => report.completed.push(id),
                Some(WorkItemStatus::Failed) => report.failed.push(id),
                _ => {}
            }
        }

        info!(completed = report.completed.len(), failed = report.failed.len(), "Processing pass finished");
        report
    }

    /// Fail items interrupted by a crash, per the queue's recovery policy
    ///
    /// Skipped while a processing pass is running in this process.
    pub async fn recover_stale(&self, now: DateTime<Utc>) -> RecoveryStats {
        debug!(%now, "recover_stale: called");
        let Ok(_worker) = self.worker.try_lock() else {
            debug!("recover_stale: processing pass running, skipping");
            return RecoveryStats::default();
        };

        let secs = i64::try_from(self.config.stale_after_secs)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1000);
        let stale_after = chrono::Duration::seconds(secs);
        let (stats, copies) = {
            let mut inner = self.inner.lock().await;
            let (stats, copies) = recover_items(
                &mut inner.items,
                now,
                stale_after,
                self.config.requeue_interrupted,
            );
            inner.items.extend(copies.iter().cloned());
            (stats, copies)
        };

        for id in &stats.interrupted {
            self.events.emit(PipelineEvent::WorkItemStatusChanged {
                item_id: id.clone(),
                status: WorkItemStatus::Failed,
            });
        }
        for copy in copies {
            self.events.emit(PipelineEvent::WorkItemEnqueued {
                item_id: copy.id,
                item_type: copy.item_type,
            });
        }

        if !stats.interrupted.is_empty() {
            info!(%stats, "Recovered interrupted work items");
        }
        stats
    }

    /// Mark an item in progress and return a snapshot to work from
    async fn begin(&self, id: &str) -> Option<AIWorkItem> {
        let snapshot = {
            let mut inner = self.inner.lock().await;
            let item = inner.find_mut(id)?;
            if let Err(e) = item.start() {
                debug!(%id, error = %e, "begin: item no longer pending");
                return None;
            }
            item.clone()
        };

        self.events.emit(PipelineEvent::WorkItemStatusChanged {
            item_id: id.to_string(),
            status: WorkItemStatus::InProgress,
        });
        Some(snapshot)
    }

    /// One upstream completion for an item
    async fn run(&self, item: &AIWorkItem) -> PipelineResult<String> {
        debug!(id = %item.id, item_type = %item.item_type, "run: called");
        let request = build_request(&self.prompts, item)?;
        let result = self.client.complete(request).await?;
        let text = result.text.trim();
        if text.is_empty() {
            return Err(PipelineError::InvalidOutput("work item result is empty".to_string()));
        }
        Ok(text.to_string())
    }

    /// Record the outcome; returns the resulting status
    async fn finish(&self, id: &str, outcome: PipelineResult<String>) -> Option<WorkItemStatus> {
        let status = {
            let mut inner = self.inner.lock().await;
            let Some(item) = inner.find_mut(id) else {
                warn!(%id, "finish: item disappeared while in progress");
                return None;
            };

            let recorded = match outcome {
                Ok(text) => item.complete(text),
                Err(e) => {
                    warn!(%id, error = %e, "Work item failed");
                    item.fail(e.to_string())
                }
            };
            if let Err(e) = recorded {
                warn!(%id, error = %e, "finish: could not record outcome");
                return None;
            }
            item.status()
        };

        info!(%id, %status, "Work item finished");
        self.events.emit(PipelineEvent::WorkItemStatusChanged {
            item_id: id.to_string(),
            status,
        });
        Some(status)
    }
}
