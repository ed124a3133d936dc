//! Durable knowledge-base seam
//!
//! Persistence is owned by the host application; the pipeline only needs a
//! place to hand finished records to.

use async_trait::async_trait;
use eyre::Result;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::KnowledgeEntry;

/// Sink for knowledge-base records
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn save(&self, entry: KnowledgeEntry) -> Result<()>;
}

/// Process-local store, useful for hosts without persistence and for tests
#[derive(Debug, Default)]
pub struct InMemoryKnowledgeStore {
    entries: Mutex<Vec<KnowledgeEntry>>,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every saved entry, in save order
    pub async fn entries(&self) -> Vec<KnowledgeEntry> {
        self.entries.lock().await.clone()
    }

    /// Entries belonging to a goal
    pub async fn for_goal(&self, goal_id: &str) -> Vec<KnowledgeEntry> {
        self.entries
            .lock()
            .await
            .iter()
            .filter(|e| e.goal_id == goal_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn save(&self, entry: KnowledgeEntry) -> Result<()> {
        debug!(entry_id = %entry.id, goal_id = %entry.goal_id, "InMemoryKnowledgeStore::save: called");
        self.entries.lock().await.push(entry);
        Ok(())
    }
}
