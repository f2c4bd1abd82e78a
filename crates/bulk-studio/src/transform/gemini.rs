//! Client for the remote image generation service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ServiceConfig;
use crate::error::{TransformError, ENTITY_NOT_FOUND};
use crate::sanitize;
use crate::secrets;

/// Default connect timeout for HTTP requests (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One generation call: a reference image plus the style prompt.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub mime_type: String,
    /// Base64-encoded source image.
    pub image_base64: String,
}

/// The remote generation service as seen by the remote transform.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Returns the first inline image of the first candidate.
    async fn generate(&self, request: &GenerationRequest) -> Result<InlineData, TransformError>;
}

// -- Wire format --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
struct GenerateContentRequest<'a> {
    contents: &'a Content,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// Picks the first inline image payload of the first candidate.
pub fn extract_image(response: GenerateContentResponse) -> Option<InlineData> {
    response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .find_map(|part| part.inline_data)
        .filter(|inline| !inline.data.is_empty())
}

/// Maps a non-success response to a transform error.
///
/// The service reports revoked or mismatched credentials as "entity not
/// found"; that case becomes [`TransformError::Authorization`].
pub fn classify_error(status: u16, body: &str) -> TransformError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    if message.contains(ENTITY_NOT_FOUND) {
        return TransformError::Authorization(message);
    }

    TransformError::Status { status, message }
}

fn build_parts(request: &GenerationRequest) -> Content {
    Content {
        parts: vec![
            Part {
                inline_data: Some(InlineData {
                    mime_type: request.mime_type.clone(),
                    data: request.image_base64.clone(),
                }),
                text: None,
            },
            Part {
                inline_data: None,
                text: Some(request.prompt.clone()),
            },
        ],
    }
}

/// HTTP client for the `generateContent` endpoint.
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    api_key: SecretString,
}

impl GeminiClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, TransformError> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(|e| TransformError::Connection {
                endpoint: sanitize::redact_url(&endpoint),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, TransformError> {
        let api_key = secrets::resolve_secret(
            config.api_key.as_deref(),
            config.api_key_file.as_deref(),
            config.api_key_env.as_deref(),
        )
        .map_err(|e| TransformError::MissingCredential(e.to_string()))?;

        Self::new(&config.endpoint, api_key, config.timeout())
    }

    fn url_for(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, model)
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<InlineData, TransformError> {
        let url = self.url_for(&request.model);
        let contents = build_parts(request);
        debug!(
            url = %sanitize::redact_url(&url),
            model = %request.model,
            "Sending generation request"
        );

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&GenerateContentRequest {
                contents: &contents,
            })
            .send()
            .await
            .map_err(|e| TransformError::Connection {
                endpoint: sanitize::redact_url(&self.endpoint),
                message: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }

        let response: GenerateContentResponse = resp
            .json()
            .await
            .map_err(|e| TransformError::InvalidResponse(e.to_string()))?;

        extract_image(response).ok_or(TransformError::NoResult)
    }
}
