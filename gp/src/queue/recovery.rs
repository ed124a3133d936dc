//! Crash recovery for interrupted work items
//!
//! An item left `in_progress` by a previous process is never resumed. Once
//! it is older than the configured threshold it is marked `failed` with an
//! "interrupted" reason and, when enabled, a fresh pending copy is queued.
//! Status never moves backward.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::domain::{AIWorkItem, WorkItemStatus};

/// Failure reason recorded on interrupted items
pub const INTERRUPTED_REASON: &str = "interrupted";

/// Outcome of one recovery scan
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryStats {
    /// IDs marked failed
    pub interrupted: Vec<String>,
    /// IDs of the pending copies created
    pub requeued: Vec<String>,
}

impl std::fmt::Display for RecoveryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "interrupted: {}, requeued: {}",
            self.interrupted.len(),
            self.requeued.len()
        )
    }
}

/// Whether an in-progress item started before `now - stale_after`
///
/// Items with no start time are treated as stale.
pub fn is_stale(item: &AIWorkItem, now: DateTime<Utc>, stale_after: Duration) -> bool {
    if item.status() != WorkItemStatus::InProgress {
        return false;
    }
    match item.started_at() {
        Some(started) => now - started >= stale_after,
        None => true,
    }
}

/// Fail stale items in place and return the copies to enqueue
pub fn recover_items(
    items: &mut [AIWorkItem],
    now: DateTime<Utc>,
    stale_after: Duration,
    requeue: bool,
) -> (RecoveryStats, Vec<AIWorkItem>) {
    debug!(item_count = items.len(), %now, requeue, "recover_items: called");
    let mut stats = RecoveryStats::default();
    let mut copies = Vec::new();

    for item in items.iter_mut().filter(|i| is_stale(i, now, stale_after)) {
        if let Err(e) = item.fail(INTERRUPTED_REASON) {
            warn!(id = %item.id, error = %e, "recover_items: could not fail item");
            continue;
        }
        info!(id = %item.id, item_type = %item.item_type, "Recovered interrupted work item");
        stats.interrupted.push(item.id.clone());

        if requeue {
            let copy = item.requeued();
            debug!(from = %item.id, to = %copy.id, "recover_items: requeued");
            stats.requeued.push(copy.id.clone());
            copies.push(copy);
        }
    }

    (stats, copies)
}
