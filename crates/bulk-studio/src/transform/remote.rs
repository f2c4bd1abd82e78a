use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use tracing::{debug, warn};

use crate::config::BatchConfig;
use crate::error::TransformError;
use crate::item::{ResultImage, SourceImage};
use crate::transform::gemini::{GenerationRequest, GenerationService};
use crate::transform::Transform;

/// MIME type sent when the source has none.
const FALLBACK_MIME_TYPE: &str = "image/png";

/// Exponential backoff for transient service failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`: `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Sends each image with the style prompt to the generation service.
pub struct RemoteTransform {
    service: Arc<dyn GenerationService>,
    retry: RetryPolicy,
}

impl RemoteTransform {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self {
            service,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn generate_with_retry(
        &self,
        request: &GenerationRequest,
    ) -> Result<ResultImage, TransformError> {
        let mut attempt = 0;
        loop {
            match self.service.generate(request).await {
                Ok(inline) => {
                    let bytes = base64::engine::general_purpose::STANDARD
                        .decode(inline.data.as_bytes())
                        .map_err(|e| TransformError::InvalidResponse(e.to_string()))?;
                    let mime_type = if inline.mime_type.is_empty() {
                        FALLBACK_MIME_TYPE.to_string()
                    } else {
                        inline.mime_type
                    };
                    return Ok(ResultImage {
                        mime_type,
                        bytes: Arc::from(bytes),
                    });
                }
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Transient generation failure, retrying: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl Transform for RemoteTransform {
    async fn apply(
        &self,
        source: &SourceImage,
        config: &BatchConfig,
    ) -> Result<ResultImage, TransformError> {
        let bytes = source.read().await?;
        let mime_type = if source.mime_type.is_empty() {
            FALLBACK_MIME_TYPE.to_string()
        } else {
            source.mime_type.clone()
        };

        let request = GenerationRequest {
            model: config.model.clone(),
            prompt: config.prompt.clone(),
            mime_type,
            image_base64: base64::engine::general_purpose::STANDARD.encode(&bytes),
        };

        debug!(name = %source.name, model = %config.model, "Generating studio image");
        self.generate_with_retry(&request).await
    }
}
