use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::IngestError;
use crate::ingest::{detect_mime_type, is_image_mime};
use crate::item::{Item, LiveHandles, SourceImage, ROOT_RELATIVE_PATH};
use crate::sanitize;

/// Recursive walk over a live root directory.
///
/// Every image file becomes an [`Item`] carrying live handles, so results can
/// be written next to their sources. Subdirectories that cannot be read are
/// skipped and sibling subtrees still contribute their images; a root that
/// cannot be listed fails the whole scan.
pub struct DirectoryScanner {
    root: PathBuf,
}

impl DirectoryScanner {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scan(&self) -> Result<Vec<Item>, IngestError> {
        let metadata = std::fs::metadata(&self.root)
            .map_err(|_| IngestError::RootNotFound(self.root.clone()))?;
        if !metadata.is_dir() {
            return Err(IngestError::RootNotDirectory(self.root.clone()));
        }

        let mut items = Vec::new();

        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if is_root_failure(&e) => {
                    return Err(IngestError::Walk {
                        path: self.root.clone(),
                        source: e,
                    });
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map(sanitize::redact_path)
                        .unwrap_or_else(|| "<unknown>".to_string());
                    warn!(path = %path, "Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(mime_type) = detect_mime_type(path).filter(|m| is_image_mime(m)) else {
                continue;
            };

            let Some(handles) = LiveHandles::for_file(path) else {
                continue;
            };

            let relative_path = relative_directory(&self.root, &handles.parent_dir);
            debug!(
                file = %sanitize::redact_path(path),
                relative_path = %relative_path,
                "Found image"
            );

            items.push(Item::new(
                SourceImage::on_disk(path.to_path_buf(), mime_type),
                relative_path,
                Some(handles),
            ));
        }

        info!(
            count = items.len(),
            root = %sanitize::redact_path(&self.root),
            "Scanned images"
        );
        Ok(items)
    }
}

/// Whether a walk error concerns listing the root itself rather than one of
/// its subdirectories.
///
/// Opening the root fails at depth 0; reading its entries fails at depth 1
/// without a path. Subdirectory failures always carry their own path or sit
/// deeper.
fn is_root_failure(error: &walkdir::Error) -> bool {
    match error.depth() {
        0 => true,
        1 => error.path().is_none(),
        _ => false,
    }
}

/// Joins the directory segments between `root` and `dir` with a trailing `/`.
/// The root itself maps to `./`.
pub fn relative_directory(root: &Path, dir: &Path) -> String {
    let Ok(relative) = dir.strip_prefix(root) else {
        return ROOT_RELATIVE_PATH.to_string();
    };

    let mut out = String::new();
    for component in relative.components() {
        out.push_str(&component.as_os_str().to_string_lossy());
        out.push('/');
    }

    if out.is_empty() {
        ROOT_RELATIVE_PATH.to_string()
    } else {
        out
    }
}
