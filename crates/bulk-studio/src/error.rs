use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::AppStatus;

/// Message text the generation service uses when the selected credential
/// no longer grants access to the requested model.
pub const ENTITY_NOT_FOUND: &str = "Requested entity was not found.";

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Run error: {0}")]
    Run(#[from] RunError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Ingestion root '{0}' does not exist")]
    RootNotFound(PathBuf),

    #[error("Ingestion root '{0}' is not a directory")]
    RootNotDirectory(PathBuf),

    #[error("Directory walk of '{path}' failed: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Ingestion task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Generation service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Authorization rejected: {0}")]
    Authorization(String),

    #[error("No image data returned from model.")]
    NoResult,

    #[error("Cannot reach generation service at {endpoint}: {message}")]
    Connection { endpoint: String, message: String },

    #[error("Invalid response from generation service: {0}")]
    InvalidResponse(String),

    #[error("Failed to load image for resizing: {0}")]
    Decode(String),

    #[error("Failed to encode result image: {0}")]
    Encode(String),

    #[error("Failed to read source image '{name}': {source}")]
    ReadSource {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No API key available: {0}")]
    MissingCredential(String),
}

impl TransformError {
    /// HTTP-style status carried by the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransformError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Rate limiting (429) and server-side failures (5xx) are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self.status(), Some(status) if status == 429 || status >= 500)
    }

    /// Returns `true` when the host should forget any cached credential
    /// selection and re-prompt before the next run.
    pub fn invalidates_credential(&self) -> bool {
        match self {
            TransformError::Authorization(_) => true,
            TransformError::Status { message, .. } => message.contains(ENTITY_NOT_FOUND),
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Failed to write result '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Failed to write archive entry '{entry}': {source}")]
    ArchiveEntry {
        entry: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("A run cannot start while the batch is {0}")]
    NotStartable(AppStatus),

    #[error("The batch is busy processing; reset or wait for it to finish")]
    Busy,

    #[error("Credential selection failed: {0}")]
    CredentialSelection(String),
}

pub type Result<T> = std::result::Result<T, StudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16, message: &str) -> TransformError {
        TransformError::Status {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_transient_statuses() {
        assert!(status(429, "slow down").is_transient());
        assert!(status(500, "boom").is_transient());
        assert!(status(503, "unavailable").is_transient());
        assert!(!status(400, "bad request").is_transient());
        assert!(!status(404, "missing").is_transient());
        assert!(!TransformError::NoResult.is_transient());
    }

    #[test]
    fn test_credential_invalidation() {
        assert!(TransformError::Authorization(ENTITY_NOT_FOUND.to_string())
            .invalidates_credential());
        assert!(status(404, ENTITY_NOT_FOUND).invalidates_credential());
        assert!(!status(404, "Model missing").invalidates_credential());
        assert!(!TransformError::Decode("bad".to_string()).invalidates_credential());
    }

    #[test]
    fn test_no_result_message_matches_host_text() {
        assert_eq!(
            TransformError::NoResult.to_string(),
            "No image data returned from model."
        );
    }
}
