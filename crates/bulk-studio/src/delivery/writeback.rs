use std::path::PathBuf;

use tracing::debug;

use crate::error::DeliveryError;
use crate::item::{LiveHandles, ResultImage, SourceImage};
use crate::sanitize;

/// Writes `result` as `<basename>_studio.png` into the source's parent
/// directory, replacing any previous output.
pub async fn write_back(
    handles: &LiveHandles,
    source: &SourceImage,
    result: &ResultImage,
) -> Result<PathBuf, DeliveryError> {
    let target = handles.parent_dir.join(source.output_file_name());

    tokio::fs::write(&target, &result.bytes)
        .await
        .map_err(|e| DeliveryError::WriteFile {
            path: target.clone(),
            source: e,
        })?;

    debug!(
        file = %sanitize::redact_path(&target),
        bytes = result.bytes.len(),
        "Wrote result next to source"
    );
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(dir: &TempDir, name: &str) -> (LiveHandles, SourceImage) {
        let file = dir.path().join(name);
        std::fs::write(&file, b"source").unwrap();
        let handles = LiveHandles::for_file(&file).unwrap();
        let source = SourceImage::on_disk(file, "image/jpeg".to_string());
        (handles, source)
    }

    #[tokio::test]
    async fn test_writes_sibling_file() {
        let dir = TempDir::new().unwrap();
        let (handles, source) = setup(&dir, "boot.jpg");

        let path = write_back(&handles, &source, &ResultImage::png(vec![1, 2, 3]))
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("boot_studio.png"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        assert_eq!(std::fs::read(dir.path().join("boot.jpg")).unwrap(), b"source");
    }

    #[tokio::test]
    async fn test_overwrites_previous_output() {
        let dir = TempDir::new().unwrap();
        let (handles, source) = setup(&dir, "boot.jpg");
        std::fs::write(dir.path().join("boot_studio.png"), b"old").unwrap();

        write_back(&handles, &source, &ResultImage::png(vec![9]))
            .await
            .unwrap();

        assert_eq!(
            std::fs::read(dir.path().join("boot_studio.png")).unwrap(),
            vec![9]
        );
    }

    #[tokio::test]
    async fn test_missing_directory_is_error() {
        let dir = TempDir::new().unwrap();
        let (mut handles, source) = setup(&dir, "boot.jpg");
        handles.parent_dir = dir.path().join("revoked");

        let err = write_back(&handles, &source, &ResultImage::png(vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::WriteFile { .. }));
    }
}
