use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::DeliveryError;
use crate::item::Item;

/// A finished result archive held in memory.
#[derive(Debug, Clone)]
pub struct StudioArchive {
    /// `studio_batch_<unix-epoch-ms>.zip`
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Entry paths in archive order.
    pub entries: Vec<String>,
}

impl StudioArchive {
    /// Writes the archive into `dir` under its own file name.
    pub async fn save_to(&self, dir: &Path) -> Result<PathBuf, DeliveryError> {
        let path = dir.join(&self.file_name);
        tokio::fs::write(&path, &self.bytes)
            .await
            .map_err(|e| DeliveryError::WriteFile {
                path: path.clone(),
                source: e,
            })?;
        Ok(path)
    }
}

pub fn archive_file_name() -> String {
    format!("studio_batch_{}.zip", chrono::Utc::now().timestamp_millis())
}

/// Packs every completed item into a ZIP mirroring the discovered folder
/// structure. Returns `None` when nothing has completed.
///
/// Two items mapping to the same entry path keep the later item's bytes.
pub fn assemble_archive(items: &[Item]) -> Result<Option<StudioArchive>, DeliveryError> {
    let mut entries: Vec<(String, Arc<[u8]>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for item in items {
        let Some(result) = item.result() else {
            continue;
        };
        let path = item.archive_entry_path();
        match positions.get(&path) {
            Some(&index) => entries[index].1 = Arc::clone(&result.bytes),
            None => {
                positions.insert(path.clone(), entries.len());
                entries.push((path, Arc::clone(&result.bytes)));
            }
        }
    }

    if entries.is_empty() {
        return Ok(None);
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for (path, bytes) in &entries {
        writer.start_file(path.as_str(), options)?;
        writer
            .write_all(bytes)
            .map_err(|e| DeliveryError::ArchiveEntry {
                entry: path.clone(),
                source: e,
            })?;
    }

    let bytes = writer.finish()?.into_inner();
    let archive = StudioArchive {
        file_name: archive_file_name(),
        bytes,
        entries: entries.into_iter().map(|(path, _)| path).collect(),
    };

    info!(
        entries = archive.entries.len(),
        size = archive.bytes.len(),
        file_name = %archive.file_name,
        "Assembled result archive"
    );
    Ok(Some(archive))
}
