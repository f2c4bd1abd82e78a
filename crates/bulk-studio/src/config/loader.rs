use std::path::Path;

use crate::config::schema::{BatchConfig, ProcessingMode};
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<BatchConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<BatchConfig, ConfigError> {
    let config: BatchConfig = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &BatchConfig) -> Result<(), ConfigError> {
    if config.target_width == 0 {
        return Err(ConfigError::Validation {
            message: "targetWidth must be at least 1".to_string(),
        });
    }

    if config.concurrency == 0 {
        return Err(ConfigError::Validation {
            message: "concurrency must be at least 1".to_string(),
        });
    }

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "model must not be empty".to_string(),
        });
    }

    if config.mode == ProcessingMode::Ai && config.prompt.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "prompt must not be empty in ai mode".to_string(),
        });
    }

    let endpoint = &config.service.endpoint;
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(ConfigError::Validation {
            message: format!("service endpoint must be an http(s) URL, got '{}'", endpoint),
        });
    }

    Ok(())
}
