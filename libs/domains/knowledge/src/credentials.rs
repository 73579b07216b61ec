//! API key resolution.
//!
//! A provider is asked exactly once per client construction attempt. Keys are
//! wrapped in [`ApiKey`], which never prints its value.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::CredentialError;

/// Default location of the secret record, relative to the working directory.
pub const DEFAULT_SECRETS_PATH: &str = "secrets.json";

/// Default environment variable read by [`EnvCredentials`].
pub const DEFAULT_API_KEY_VAR: &str = "VECTOR_DB_API_KEY";

/// A non-blank API key. `Debug` and `Display` are redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for empty or whitespace-only input.
    pub fn parse(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Source of the API key used to build the vector store client.
pub trait CredentialProvider: Send + Sync {
    fn load(&self) -> Result<ApiKey, CredentialError>;
}

#[derive(Deserialize)]
struct SecretRecord {
    key: Option<String>,
}

/// Reads `{"key": "..."}` from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileCredentials {
    path: PathBuf,
}

impl JsonFileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for JsonFileCredentials {
    fn default() -> Self {
        Self::new(DEFAULT_SECRETS_PATH)
    }
}

impl CredentialProvider for JsonFileCredentials {
    fn load(&self) -> Result<ApiKey, CredentialError> {
        let shown = self.path.display();

        let raw = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CredentialError::Missing(format!(
                    "secret file '{}' not found",
                    shown
                )));
            }
            Err(e) => {
                return Err(CredentialError::Malformed(format!(
                    "secret file '{}' could not be read: {}",
                    shown, e
                )));
            }
        };

        let text = String::from_utf8(raw).map_err(|_| {
            CredentialError::Malformed(format!("secret file '{}' is not valid UTF-8", shown))
        })?;

        let record: SecretRecord = serde_json::from_str(&text).map_err(|e| {
            CredentialError::Malformed(format!("secret file '{}' is not valid JSON: {}", shown, e))
        })?;

        let key = record.key.and_then(ApiKey::parse).ok_or_else(|| {
            CredentialError::Missing(format!(
                "secret file '{}' has no non-blank 'key' field",
                shown
            ))
        })?;

        debug!(path = %shown, "Loaded API key from secret file");
        Ok(key)
    }
}

/// Reads the key from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new(DEFAULT_API_KEY_VAR)
    }
}

impl CredentialProvider for EnvCredentials {
    fn load(&self) -> Result<ApiKey, CredentialError> {
        let raw = std::env::var(&self.var).map_err(|e| match e {
            std::env::VarError::NotPresent => {
                CredentialError::Missing(format!("environment variable '{}' is not set", self.var))
            }
            std::env::VarError::NotUnicode(_) => CredentialError::Malformed(format!(
                "environment variable '{}' is not valid UTF-8",
                self.var
            )),
        })?;

        ApiKey::parse(raw).ok_or_else(|| {
            CredentialError::Missing(format!("environment variable '{}' is blank", self.var))
        })
    }
}

/// An explicitly supplied key. A blank key is rejected here, before any
/// manager is built around it.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    key: ApiKey,
}

impl StaticCredentials {
    pub fn new(key: impl Into<String>) -> Result<Self, CredentialError> {
        let key = ApiKey::parse(key)
            .ok_or_else(|| CredentialError::Missing("explicit API key is blank".to_string()))?;
        Ok(Self { key })
    }
}

impl CredentialProvider for StaticCredentials {
    fn load(&self) -> Result<ApiKey, CredentialError> {
        Ok(self.key.clone())
    }
}
