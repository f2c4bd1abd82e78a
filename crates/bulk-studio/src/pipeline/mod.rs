//! Run controller: owns the batch, its state machine and the per-run
//! worker pool.

pub mod controller;
pub mod notice;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use controller::BatchController;
pub use notice::{Notice, NoticeKind};

/// Process-wide run state.
///
/// `idle -> scanning -> ready -> processing -> done`, back to `idle` on reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    #[default]
    Idle,
    Scanning,
    Ready,
    Processing,
    Done,
}

impl AppStatus {
    /// A run can start over a freshly ingested batch or re-run a finished one.
    pub fn can_start_run(self) -> bool {
        matches!(self, AppStatus::Ready | AppStatus::Done)
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppStatus::Idle => write!(f, "idle"),
            AppStatus::Scanning => write!(f, "scanning"),
            AppStatus::Ready => write!(f, "ready"),
            AppStatus::Processing => write!(f, "processing"),
            AppStatus::Done => write!(f, "done"),
        }
    }
}

/// Interactive API key selection offered by the host.
#[async_trait]
pub trait CredentialSelector: Send + Sync {
    /// Whether the user already picked a key.
    async fn has_selected_key(&self) -> bool;

    /// Opens the host's key picker and waits for the user.
    async fn select_key(&self) -> Result<(), String>;
}

/// Counts over the current batch, for progress display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub errored: usize,
    /// `completed / total` as a rounded percentage, 0 for an empty batch.
    pub progress_percent: u8,
}

/// Outcome of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Items that reached a terminal state in this run.
    pub processed: usize,
    pub completed: usize,
    pub errored: usize,
    /// Results dropped because the batch was reset mid-run.
    pub discarded: usize,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
