//! Test harness for isolated folder-based tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;

use bulk_studio::{
    BatchConfig, BatchController, IngestSource, Item, ListedFile, ProcessingMode,
};

/// A temporary product folder that tests fill with images.
pub struct TestHarness {
    temp_dir: TempDir,
    /// The folder handed to ingestion.
    pub root: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("products");
        std::fs::create_dir_all(&root).expect("Failed to create root directory");
        Self { temp_dir, root }
    }

    /// Absolute path of `relative` under the root.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Writes raw bytes, creating parent directories.
    pub fn add_file(&self, relative: &str, bytes: &[u8]) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, bytes).expect("Failed to write file");
        path
    }

    /// Writes a real, decodable image of the given size.
    pub fn add_image(&self, relative: &str, width: u32, height: u32) -> PathBuf {
        let format = ImageFormat::from_path(relative).unwrap_or(ImageFormat::Png);
        self.add_file(relative, &image_bytes(width, height, format))
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    pub fn read(&self, relative: &str) -> Vec<u8> {
        std::fs::read(self.path(relative)).expect("Failed to read file")
    }

    pub fn live_source(&self) -> IngestSource {
        IngestSource::Live(self.root.clone())
    }

    /// Ingests the root as a live folder and returns the batch.
    pub async fn ingest_live(&self, controller: &BatchController) -> Arc<Vec<Item>> {
        controller
            .ingest(self.live_source())
            .await
            .expect("Live ingestion failed")
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Creates `relative` and revokes all access to it. When the process can
    /// still list it (running as root), falls back to a procfs directory that
    /// stays unlistable. Returns `None` if neither works on this machine.
    ///
    /// Call [`unlock`](Self::unlock) afterwards so the temp dir can be removed.
    #[cfg(unix)]
    pub fn unlistable_dir(&self, relative: &str) -> Option<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        let dir = self.path(relative);
        std::fs::create_dir_all(&dir).expect("Failed to create directory");
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o000))
            .expect("Failed to lock directory");
        if !is_listable(&dir) {
            return Some(dir);
        }

        let procfs = PathBuf::from("/proc/1/map_files");
        (procfs.is_dir() && !is_listable(&procfs)).then_some(procfs)
    }

    #[cfg(unix)]
    pub fn unlock(&self, relative: &str) {
        use std::os::unix::fs::PermissionsExt;

        std::fs::set_permissions(self.path(relative), std::fs::Permissions::from_mode(0o755))
            .expect("Failed to unlock directory");
    }
}

fn is_listable(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .and_then(|mut entries| entries.next().transpose())
        .is_ok()
}

/// Encodes a solid-colour image.
pub fn image_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([180, 120, 60]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, format)
        .expect("Failed to encode test image");
    out.into_inner()
}

/// A flat selection of in-memory files, each carrying its relative path.
pub fn listed(paths: &[&str]) -> IngestSource {
    IngestSource::FileList(
        paths
            .iter()
            .map(|p| ListedFile::from_bytes(*p, p.as_bytes().to_vec()))
            .collect(),
    )
}

pub fn ai_config(concurrency: usize) -> BatchConfig {
    BatchConfig {
        mode: ProcessingMode::Ai,
        concurrency,
        ..Default::default()
    }
}

pub fn resize_config(target_width: u32) -> BatchConfig {
    BatchConfig {
        mode: ProcessingMode::Resize,
        target_width,
        ..Default::default()
    }
}

/// Looks an item up by its source file name.
pub fn item_named<'a>(items: &'a [Item], name: &str) -> &'a Item {
    items
        .iter()
        .find(|i| i.source.name == name)
        .unwrap_or_else(|| panic!("No item named {}", name))
}
