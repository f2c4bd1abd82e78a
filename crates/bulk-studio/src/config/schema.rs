use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Upper bound on concurrent local resizes, independent of the configured
/// network concurrency.
pub const RESIZE_WORKER_CAP: usize = 8;

pub const DEFAULT_PROMPT: &str = "High-quality professional studio photograph, same product and style as reference image, soft natural lighting, clean minimal background, sharp focus, realistic fabric texture, commercial product photography, 4k quality no major change (no change just make it better) dimensions 800px * 800px and bleed 30px into 30px";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Global configuration for one batch run. Read-only while a run is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfig {
    #[serde(default)]
    pub mode: ProcessingMode,
    /// Style prompt sent with every image in `ai` mode.
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Output width in pixels; height follows the source aspect ratio.
    #[serde(default = "default_target_width")]
    pub target_width: u32,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default = "default_model")]
    pub model: String,
    /// Concurrent remote requests in `ai` mode.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub service: ServiceConfig,
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

fn default_target_width() -> u32 {
    800
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_concurrency() -> usize {
    3
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            mode: ProcessingMode::default(),
            prompt: default_prompt(),
            target_width: default_target_width(),
            aspect_ratio: AspectRatio::default(),
            model: default_model(),
            concurrency: default_concurrency(),
            service: ServiceConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Number of workers for a run over `pending` items.
    ///
    /// Remote transforms use the configured concurrency as-is; local resizes
    /// use a fixed cap bounded by the amount of work.
    pub fn worker_count(&self, pending: usize) -> usize {
        match self.mode {
            ProcessingMode::Ai => self.concurrency,
            ProcessingMode::Resize => RESIZE_WORKER_CAP.min(pending),
        }
    }

    /// Whether the configured model needs an interactive credential pick.
    pub fn requires_credential_selection(&self) -> bool {
        self.mode == ProcessingMode::Ai
            && self
                .service
                .interactive_models
                .iter()
                .any(|m| m == &self.model)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// Remote image generation.
    #[default]
    Ai,
    /// Local deterministic resize.
    Resize,
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingMode::Ai => write!(f, "ai"),
            ProcessingMode::Resize => write!(f, "resize"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "16:9")]
    Landscape16x9,
}

/// Connection settings for the remote generation service.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Inline API key. Prefer `api_key_file` or `api_key_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
    /// Models that require the host's interactive credential selection.
    #[serde(default = "default_interactive_models")]
    pub interactive_models: Vec<String>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_api_key_env() -> Option<String> {
    Some("API_KEY".to_string())
}

fn default_interactive_models() -> Vec<String> {
    vec!["gemini-3-pro-image-preview".to_string()]
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
            api_key_file: None,
            api_key_env: default_api_key_env(),
            interactive_models: default_interactive_models(),
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "****"))
            .field("api_key_file", &self.api_key_file)
            .field("api_key_env", &self.api_key_env)
            .field("interactive_models", &self.interactive_models)
            .finish()
    }
}
