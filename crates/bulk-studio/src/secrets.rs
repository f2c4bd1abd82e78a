//! API key resolution for the remote generation service.
//!
//! Sources, highest priority first: inline `apiKey`, the `apiKeyFile` path,
//! then the `apiKeyEnv` variable (`API_KEY` unless configured otherwise).

use secrecy::SecretString;
use std::fs;

/// Why no API key could be resolved.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No API key configured (set apiKey, apiKeyFile or apiKeyEnv)")]
    NoSource,

    #[error("Failed to read API key file '{path}': {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvMissing { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvNotUnicode { name: String },
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Resolves the key from the first configured source.
///
/// Empty strings count as not configured. File and environment values are
/// trimmed; the inline value is taken as-is.
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString, SecretError> {
    if let Some(value) = non_empty(direct) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = non_empty(file_path) {
        let path = expand_home(path);
        let content = fs::read_to_string(&path).map_err(|source| SecretError::ReadFile {
            path: path.clone(),
            source,
        })?;
        return Ok(SecretString::from(content.trim().to_string()));
    }

    if let Some(name) = non_empty(env_var) {
        let value = std::env::var(name).map_err(|e| match e {
            std::env::VarError::NotPresent => SecretError::EnvMissing {
                name: name.to_string(),
            },
            std::env::VarError::NotUnicode(_) => SecretError::EnvNotUnicode {
                name: name.to_string(),
            },
        })?;
        return Ok(SecretString::from(value.trim().to_string()));
    }

    Err(SecretError::NoSource)
}

/// `~` and `~/...` expand to HOME (or USERPROFILE); `~user` is left alone.
fn expand_home(path: &str) -> String {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return path.to_string(),
    };
    match std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        Some(home) => format!("{}{}", home.to_string_lossy(), rest),
        None => path.to_string(),
    }
}
