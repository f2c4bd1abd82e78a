//! Loading batch configuration files from disk.

use assert_fs::prelude::*;
use assert_fs::TempDir;

use bulk_studio::{load_config, AspectRatio, ConfigError, ProcessingMode};

#[test]
fn test_load_host_config_file() {
    let temp = TempDir::new().unwrap();
    let file = temp.child("studio.json");
    file.write_str(
        r#"{
            "mode": "ai",
            "prompt": "matte grey backdrop, soft shadows",
            "targetWidth": 1024,
            "aspectRatio": "3:4",
            "model": "gemini-3-pro-image-preview",
            "concurrency": 4,
            "service": {
                "endpoint": "https://proxy.internal.example",
                "apiKeyFile": "~/.config/studio/key"
            }
        }"#,
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();

    assert_eq!(config.mode, ProcessingMode::Ai);
    assert_eq!(config.target_width, 1024);
    assert_eq!(config.aspect_ratio, AspectRatio::Portrait3x4);
    assert_eq!(config.concurrency, 4);
    assert_eq!(config.worker_count(50), 4);
    assert!(config.requires_credential_selection());
    assert_eq!(config.service.endpoint, "https://proxy.internal.example");
    assert_eq!(
        config.service.api_key_file.as_deref(),
        Some("~/.config/studio/key")
    );
    assert_eq!(config.service.api_key_env.as_deref(), Some("API_KEY"));
}

#[test]
fn test_missing_file() {
    let temp = TempDir::new().unwrap();
    let err = load_config(temp.child("absent.json").path()).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
}

#[test]
fn test_invalid_json() {
    let temp = TempDir::new().unwrap();
    let file = temp.child("broken.json");
    file.write_str("{ \"mode\": ").unwrap();

    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ParseJson(_)));
}

#[test]
fn test_validation_rejects_zero_concurrency() {
    let temp = TempDir::new().unwrap();
    let file = temp.child("zero.json");
    file.write_str(r#"{ "concurrency": 0 }"#).unwrap();

    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { .. }));
    assert!(err.to_string().contains("concurrency"));
}

#[test]
fn test_unknown_mode_is_parse_error() {
    let temp = TempDir::new().unwrap();
    let file = temp.child("mode.json");
    file.write_str(r#"{ "mode": "upscale" }"#).unwrap();

    assert!(matches!(
        load_config(file.path()).unwrap_err(),
        ConfigError::ParseJson(_)
    ));
}
