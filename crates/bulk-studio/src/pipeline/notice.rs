use serde::{Deserialize, Serialize};

use crate::ingest::SourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
    Security,
}

/// A batch-level banner for the host view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The notice raised after an ingestion pass found `count` images.
    pub fn for_ingestion(kind: SourceKind, count: usize) -> Self {
        match (kind, count) {
            (SourceKind::Live, 0) => Self::new(
                NoticeKind::Warning,
                "No images found in the selected folder.",
            ),
            (SourceKind::FileList, 0) => Self::new(
                NoticeKind::Warning,
                "No images found in the uploaded selection.",
            ),
            (SourceKind::Live, _) => Self::new(
                NoticeKind::Info,
                "Folder access granted. Images will be saved directly back to your local folder.",
            ),
            (SourceKind::FileList, _) => Self::new(
                NoticeKind::Info,
                "Folder uploaded. Due to security restrictions, results will be provided as a ZIP that preserves your original folder structure.",
            ),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, message)
    }
}
