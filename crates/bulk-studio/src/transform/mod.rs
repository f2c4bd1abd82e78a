//! Transform strategies: turn a source image into a result image.
//!
//! Two implementations exist, selected once per run from the configured
//! [`ProcessingMode`]: [`RemoteTransform`] calls the generation service and
//! retries transient failures, [`LocalResize`] scales the image on this
//! machine and never retries.

pub mod gemini;
pub mod remote;
pub mod resize;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{BatchConfig, ProcessingMode};
use crate::error::TransformError;
use crate::item::{ResultImage, SourceImage};

pub use gemini::{GeminiClient, GenerationRequest, GenerationService, InlineData};
pub use remote::{RemoteTransform, RetryPolicy};
pub use resize::LocalResize;

#[async_trait]
pub trait Transform: Send + Sync {
    /// Produces the result image for one source.
    async fn apply(
        &self,
        source: &SourceImage,
        config: &BatchConfig,
    ) -> Result<ResultImage, TransformError>;
}

/// Builds the production strategy for `config.mode`.
///
/// The remote strategy resolves its API key here, so a missing key fails the
/// run setup rather than every item.
pub fn for_config(config: &BatchConfig) -> Result<Arc<dyn Transform>, TransformError> {
    match config.mode {
        ProcessingMode::Ai => {
            let client = GeminiClient::from_config(&config.service)?;
            Ok(Arc::new(RemoteTransform::new(Arc::new(client))))
        }
        ProcessingMode::Resize => Ok(Arc::new(LocalResize)),
    }
}
