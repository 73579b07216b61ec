use std::path::PathBuf;

use core_config::{env_optional, env_or_default, ConfigError, FromEnv};

use crate::client::DEFAULT_SOURCE_TAG;
use crate::credentials::DEFAULT_SECRETS_PATH;
use crate::policy::NetworkPolicy;

/// Vector store connection configuration
#[derive(Debug, Clone)]
pub struct VectorDbConfig {
    /// Remote host; `None` lets the client pick its default
    pub host: Option<String>,
    /// JSON file holding `{"key": "..."}`
    pub secrets_path: PathBuf,
    /// Analytics label sent with every request
    pub source_tag: Option<String>,
    pub policy: NetworkPolicy,
}

impl VectorDbConfig {
    pub fn new(secrets_path: impl Into<PathBuf>) -> Self {
        Self {
            secrets_path: secrets_path.into(),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_policy(mut self, policy: NetworkPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            host: None,
            secrets_path: PathBuf::from(DEFAULT_SECRETS_PATH),
            source_tag: Some(DEFAULT_SOURCE_TAG.to_string()),
            policy: NetworkPolicy::default(),
        }
    }
}

/// Load VectorDbConfig from environment variables
///
/// Environment variables:
/// - `VECTOR_DB_URL` (optional) - remote host
/// - `VECTOR_DB_SECRETS_PATH` (optional, default `secrets.json`)
/// - `VECTOR_DB_SOURCE_TAG` (optional, default `embedding-vector-service`)
/// - network policy variables, see [`NetworkPolicy`]
impl FromEnv for VectorDbConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_optional("VECTOR_DB_URL"),
            secrets_path: PathBuf::from(env_or_default(
                "VECTOR_DB_SECRETS_PATH",
                DEFAULT_SECRETS_PATH,
            )),
            source_tag: Some(
                env_optional("VECTOR_DB_SOURCE_TAG")
                    .unwrap_or_else(|| DEFAULT_SOURCE_TAG.to_string()),
            ),
            policy: NetworkPolicy::from_env()?,
        })
    }
}
