//! Maintenance task handler.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use visum_core::{CorpusStore, MaintenanceTask, Result};

use crate::handler::{outcome, TaskHandler, TaskOutcome};
use crate::transport::MAINTENANCE_QUEUE;

/// Action wiping both persisted collections.
pub const CLEAR_ALL_COLLECTIONS: &str = "clear_all_collections";

/// Handles maintenance tasks. The whole queue is gated behind a config
/// flag; with the flag off every task is acknowledged as a no-op.
pub struct MaintenanceHandler {
    corpus: Arc<dyn CorpusStore>,
    enabled: bool,
}

impl MaintenanceHandler {
    pub fn new(corpus: Arc<dyn CorpusStore>, enabled: bool) -> Self {
        Self { corpus, enabled }
    }
}

#[async_trait]
impl TaskHandler for MaintenanceHandler {
    fn queue(&self) -> &'static str {
        MAINTENANCE_QUEUE
    }

    async fn execute(&self, payload: &[u8]) -> Result<TaskOutcome> {
        let task: MaintenanceTask = serde_json::from_slice(payload)?;

        if !self.enabled {
            warn!(
                action = task.action.as_deref().unwrap_or("(missing)"),
                "maintenance queue disabled"
            );
            return Ok(TaskOutcome::Rejected(outcome::MAINTENANCE_NOT_ALLOWED));
        }

        match task.action.as_deref() {
            Some(CLEAR_ALL_COLLECTIONS) => {
                self.corpus.clear_all().await?;
                info!(action = CLEAR_ALL_COLLECTIONS, "collections cleared");
                Ok(TaskOutcome::Completed(outcome::COLLECTIONS_CLEARED))
            }
            other => {
                warn!(
                    action = other.unwrap_or("(missing)"),
                    "unknown maintenance action"
                );
                Ok(TaskOutcome::Rejected(outcome::UNKNOWN_MAINTENANCE_ACTION))
            }
        }
    }
}
