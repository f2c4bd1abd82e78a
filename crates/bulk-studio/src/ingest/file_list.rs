use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::ingest::{detect_mime_type, is_image_mime};
use crate::item::{Item, SourceData, SourceImage, ROOT_RELATIVE_PATH};

/// One file from a flat selection (picker or drag-and-drop).
#[derive(Debug, Clone)]
pub struct ListedFile {
    /// Host-supplied relative path string, e.g. `products/shoes/b.png`.
    pub relative_path: String,
    /// MIME type reported by the host, if any.
    pub mime_type: Option<String>,
    pub data: SourceData,
}

impl ListedFile {
    pub fn from_bytes(relative_path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            relative_path: relative_path.into(),
            mime_type: None,
            data: SourceData::InMemory(Arc::from(bytes)),
        }
    }

    pub fn from_path(relative_path: impl Into<String>, path: PathBuf) -> Self {
        Self {
            relative_path: relative_path.into(),
            mime_type: None,
            data: SourceData::OnDisk(path),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Last segment of the relative path string, falling back to the on-disk
    /// file name when the host supplied no path.
    pub fn file_name(&self) -> String {
        let normalized = self.relative_path.replace('\\', "/");
        match normalized.rsplit('/').next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => match &self.data {
                SourceData::OnDisk(path) => path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "image".to_string()),
                SourceData::InMemory(_) => "image".to_string(),
            },
        }
    }

    fn resolved_mime_type(&self) -> Option<String> {
        self.mime_type
            .clone()
            .filter(|m| !m.is_empty())
            .or_else(|| detect_mime_type(Path::new(&self.file_name())))
    }
}

/// Builds items from a flat file list. Items carry no live handles, so their
/// results can only be delivered through the archive.
pub struct FileListIngestor {
    files: Vec<ListedFile>,
}

impl FileListIngestor {
    pub fn new(files: Vec<ListedFile>) -> Self {
        Self { files }
    }

    pub fn collect(self) -> Vec<Item> {
        let total = self.files.len();
        let items: Vec<Item> = self
            .files
            .into_iter()
            .filter_map(|file| {
                let mime_type = file.resolved_mime_type().filter(|m| is_image_mime(m))?;
                let relative_path = directory_of(&file.relative_path);
                let source = SourceImage {
                    name: file.file_name(),
                    mime_type,
                    data: file.data,
                };
                Some(Item::new(source, relative_path, None))
            })
            .collect();

        info!(count = items.len(), total, "Collected images from file list");
        items
    }
}

/// Strips the file name from a relative path string: `a/b/c.png` -> `a/b/`,
/// `c.png` -> `./`.
pub fn directory_of(relative_path: &str) -> String {
    let normalized = relative_path.replace('\\', "/");
    let mut parts: Vec<&str> = normalized.split('/').collect();
    parts.pop();

    if parts.is_empty() {
        ROOT_RELATIVE_PATH.to_string()
    } else {
        format!("{}/", parts.join("/"))
    }
}
