use std::io::Cursor;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::config::BatchConfig;
use crate::error::TransformError;
use crate::item::{ResultImage, SourceImage};
use crate::transform::Transform;

/// Scales each image to the configured width on this machine.
///
/// Deterministic and offline; failures are never retried.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalResize;

#[async_trait]
impl Transform for LocalResize {
    async fn apply(
        &self,
        source: &SourceImage,
        config: &BatchConfig,
    ) -> Result<ResultImage, TransformError> {
        let bytes = source.read().await?;
        let target_width = config.target_width;

        let png = tokio::task::spawn_blocking(move || resize_to_width(&bytes, target_width))
            .await
            .map_err(|e| TransformError::Encode(e.to_string()))??;

        Ok(ResultImage::png(png))
    }
}

/// Output height for a `width` x `height` source scaled to `target_width`,
/// truncated, never below one pixel.
pub fn target_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 {
        return 1;
    }
    let scaled = u64::from(target_width) * u64::from(height) / u64::from(width);
    scaled.clamp(1, u64::from(u32::MAX)) as u32
}

/// Decodes `bytes`, resizes to `target_width` keeping the aspect ratio and
/// re-encodes as PNG.
pub fn resize_to_width(bytes: &[u8], target_width: u32) -> Result<Vec<u8>, TransformError> {
    let img = image::load_from_memory(bytes).map_err(|e| TransformError::Decode(e.to_string()))?;

    let width = target_width.max(1);
    let height = target_height(img.width(), img.height(), width);
    let resized = img.resize_exact(width, height, FilterType::Lanczos3);
    let resized = DynamicImage::ImageRgba8(resized.to_rgba8());

    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| TransformError::Encode(e.to_string()))?;

    Ok(out.into_inner())
}
