//! Folder ingestion: turns a granted folder (or a flat file selection) into
//! an ordered list of pending [`Item`]s.

pub mod file_list;
pub mod scanner;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::item::Item;

pub use file_list::{FileListIngestor, ListedFile};
pub use scanner::DirectoryScanner;

/// What the host was able to obtain from the user.
#[derive(Debug, Clone)]
pub enum IngestSource {
    /// A live, recursively enumerable root directory with write access.
    Live(PathBuf),
    /// A flat selection where each file carries its own relative path string.
    FileList(Vec<ListedFile>),
}

/// Which capability produced the current batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Live,
    FileList,
}

/// Result of one ingestion pass.
#[derive(Debug, Clone)]
pub struct Ingestion {
    pub kind: SourceKind,
    pub items: Vec<Item>,
}

/// Runs the ingestion variant matching `source`.
///
/// The live walk is blocking filesystem work and is moved off the async
/// executor.
pub async fn ingest(source: IngestSource) -> Result<Ingestion, IngestError> {
    match source {
        IngestSource::Live(root) => {
            let scanner = DirectoryScanner::new(root);
            let items = tokio::task::spawn_blocking(move || scanner.scan())
                .await
                .map_err(|e| IngestError::Task(e.to_string()))??;
            Ok(Ingestion {
                kind: SourceKind::Live,
                items,
            })
        }
        IngestSource::FileList(files) => Ok(Ingestion {
            kind: SourceKind::FileList,
            items: FileListIngestor::new(files).collect(),
        }),
    }
}

/// Detects MIME type from a file name using the mime_guess crate.
/// Returns `None` for unknown extensions.
pub fn detect_mime_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path).first().map(|m| m.to_string())
}

pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}
