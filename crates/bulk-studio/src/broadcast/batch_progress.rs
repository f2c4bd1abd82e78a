//! Batch progress broadcaster for real-time status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::item::ItemStatus;
use crate::pipeline::{AppStatus, Notice, RunSummary};

/// What changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEventKind {
    /// The overall run state moved.
    StatusChanged { status: AppStatus },
    /// One item changed state.
    #[serde(rename_all = "camelCase")]
    ItemUpdated {
        item_id: String,
        filename: String,
        status: ItemStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// A batch-level notice was raised.
    Notice { notice: Notice },
    /// All workers stopped.
    RunFinished { summary: RunSummary },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEvent {
    #[serde(flatten)]
    pub kind: BatchEventKind,
    pub timestamp: DateTime<Utc>,
}

impl BatchEvent {
    pub fn new(kind: BatchEventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }
}

/// Broadcasts batch events to any number of subscribers.
#[derive(Clone)]
pub struct BatchProgressBroadcaster {
    sender: Arc<broadcast::Sender<BatchEvent>>,
}

impl BatchProgressBroadcaster {
    /// Creates a broadcaster with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, kind: BatchEventKind) {
        // No active receivers is fine
        let _ = self.sender.send(BatchEvent::new(kind));
    }

    pub fn status_changed(&self, status: AppStatus) {
        self.send(BatchEventKind::StatusChanged { status });
    }

    pub fn item_updated(
        &self,
        item_id: &str,
        filename: &str,
        status: ItemStatus,
        error: Option<&str>,
    ) {
        self.send(BatchEventKind::ItemUpdated {
            item_id: item_id.to_string(),
            filename: filename.to_string(),
            status,
            error: error.map(|e| e.to_string()),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.sender.subscribe()
    }
}

impl Default for BatchProgressBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}
