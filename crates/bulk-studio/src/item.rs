//! The unit of work: one discovered image and its processing lifecycle.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::TransformError;

/// Suffix appended to the source basename for every delivered result.
pub const OUTPUT_SUFFIX: &str = "_studio.png";

/// Relative path recorded for images found directly under the ingestion root.
pub const ROOT_RELATIVE_PATH: &str = "./";

/// Lifecycle status of an [`Item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl ItemStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Error)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Pending => write!(f, "pending"),
            ItemStatus::Processing => write!(f, "processing"),
            ItemStatus::Completed => write!(f, "completed"),
            ItemStatus::Error => write!(f, "error"),
        }
    }
}

/// Where the source bytes live.
#[derive(Debug, Clone)]
pub enum SourceData {
    /// A file on disk, read lazily when the item is processed.
    OnDisk(PathBuf),
    /// Bytes handed over by the host (drag-and-drop, upload).
    InMemory(Arc<[u8]>),
}

/// The immutable source reference captured at discovery.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// File name including extension, e.g. `shoe.jpg`.
    pub name: String,
    /// MIME type, always `image/*` for ingested items.
    pub mime_type: String,
    pub data: SourceData,
}

impl SourceImage {
    pub fn on_disk(path: PathBuf, mime_type: String) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());
        Self {
            name,
            mime_type,
            data: SourceData::OnDisk(path),
        }
    }

    pub fn in_memory(name: String, mime_type: String, bytes: Arc<[u8]>) -> Self {
        Self {
            name,
            mime_type,
            data: SourceData::InMemory(bytes),
        }
    }

    /// Loads the source bytes.
    pub async fn read(&self) -> Result<Arc<[u8]>, TransformError> {
        match &self.data {
            SourceData::InMemory(bytes) => Ok(Arc::clone(bytes)),
            SourceData::OnDisk(path) => tokio::fs::read(path)
                .await
                .map(Arc::from)
                .map_err(|e| TransformError::ReadSource {
                    name: self.name.clone(),
                    source: e,
                }),
        }
    }

    /// Name of the delivered result: basename up to the first `.` plus `_studio.png`.
    pub fn output_file_name(&self) -> String {
        output_file_name(&self.name)
    }
}

/// Builds `<basename>_studio.png` from a source file name.
pub fn output_file_name(source_name: &str) -> String {
    let stem = source_name.split('.').next().unwrap_or(source_name);
    format!("{}{}", stem, OUTPUT_SUFFIX)
}

/// Live filesystem capabilities recorded by the recursive walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveHandles {
    /// The discovered image file.
    pub file: PathBuf,
    /// The directory that contains `file`; write-back targets it.
    pub parent_dir: PathBuf,
}

impl LiveHandles {
    pub fn for_file(file: &Path) -> Option<Self> {
        let parent_dir = file.parent()?.to_path_buf();
        Some(Self {
            file: file.to_path_buf(),
            parent_dir,
        })
    }
}

/// A finished transform result.
#[derive(Debug, Clone)]
pub struct ResultImage {
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl ResultImage {
    pub fn png(bytes: Vec<u8>) -> Self {
        Self {
            mime_type: "image/png".to_string(),
            bytes: Arc::from(bytes),
        }
    }

    /// Renders the result as a `data:` URL for display.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Processing state. Terminal variants carry exactly one of result or error.
#[derive(Debug, Clone)]
pub enum ItemState {
    Pending,
    Processing,
    Completed { result: ResultImage },
    Error { message: String },
}

impl ItemState {
    pub fn status(&self) -> ItemStatus {
        match self {
            ItemState::Pending => ItemStatus::Pending,
            ItemState::Processing => ItemStatus::Processing,
            ItemState::Completed { .. } => ItemStatus::Completed,
            ItemState::Error { .. } => ItemStatus::Error,
        }
    }
}

/// One discovered image.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: String,
    pub source: SourceImage,
    /// Present only when the item came from a live recursive walk.
    pub handles: Option<LiveHandles>,
    /// Directory prefix relative to the ingestion root, `./` for the root itself.
    pub relative_path: String,
    /// Display-only reference to the source.
    pub original_url: String,
    state: ItemState,
}

impl Item {
    pub fn new(source: SourceImage, relative_path: String, handles: Option<LiveHandles>) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let original_url = match &source.data {
            SourceData::OnDisk(path) => format!("file://{}", path.display()),
            SourceData::InMemory(_) => format!("memory://{}/{}", id, source.name),
        };
        let relative_path = if relative_path.is_empty() {
            ROOT_RELATIVE_PATH.to_string()
        } else {
            relative_path
        };

        Self {
            id,
            source,
            handles,
            relative_path,
            original_url,
            state: ItemState::Pending,
        }
    }

    pub fn state(&self) -> &ItemState {
        &self.state
    }

    pub fn status(&self) -> ItemStatus {
        self.state.status()
    }

    pub fn result(&self) -> Option<&ResultImage> {
        match &self.state {
            ItemState::Completed { result } => Some(result),
            _ => None,
        }
    }

    pub fn result_url(&self) -> Option<String> {
        self.result().map(ResultImage::data_url)
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            ItemState::Error { message } => Some(message),
            _ => None,
        }
    }

    pub fn has_live_handles(&self) -> bool {
        self.handles.is_some()
    }

    /// Path of this item's entry inside a result archive.
    pub fn archive_entry_path(&self) -> String {
        let file_name = self.source.output_file_name();
        if self.relative_path == ROOT_RELATIVE_PATH {
            file_name
        } else {
            format!("{}{}", self.relative_path, file_name)
        }
    }

    /// Claims the item for a worker. Only pending or previously failed
    /// items can be claimed.
    pub fn claimed(&self) -> Option<Item> {
        match self.state {
            ItemState::Pending | ItemState::Error { .. } => {
                Some(self.with_state(ItemState::Processing))
            }
            _ => None,
        }
    }

    /// Records a successful transform. Only valid while processing.
    pub fn completed(&self, result: ResultImage) -> Option<Item> {
        match self.state {
            ItemState::Processing => Some(self.with_state(ItemState::Completed { result })),
            _ => None,
        }
    }

    /// Records a failed transform. Only valid while processing.
    pub fn failed(&self, message: impl Into<String>) -> Option<Item> {
        match self.state {
            ItemState::Processing => Some(self.with_state(ItemState::Error {
                message: message.into(),
            })),
            _ => None,
        }
    }

    /// Puts the item back in the queue regardless of its previous outcome.
    pub fn requeued(&self) -> Item {
        self.with_state(ItemState::Pending)
    }

    fn with_state(&self, state: ItemState) -> Item {
        Item {
            state,
            ..self.clone()
        }
    }
}
