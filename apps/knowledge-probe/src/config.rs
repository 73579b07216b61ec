//! Configuration for the knowledge probe

use std::path::PathBuf;

use core_config::{Environment, FromEnv};
use domain_knowledge::VectorDbConfig;
use eyre::Result;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub vector_db: VectorDbConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            environment: Environment::from_env(),
            vector_db: VectorDbConfig::from_env()?,
        })
    }

    /// Command-line flags win over the environment.
    pub fn with_overrides(mut self, host: Option<String>, secrets: Option<PathBuf>) -> Self {
        if let Some(host) = host {
            self.vector_db.host = Some(host);
        }
        if let Some(secrets) = secrets {
            self.vector_db.secrets_path = secrets;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_environment() {
        temp_env::with_vars(
            [
                ("VECTOR_DB_URL", Some("env-host:6334")),
                ("VECTOR_DB_SECRETS_PATH", Some("/etc/env-secrets.json")),
            ],
            || {
                let config = Config::from_env()
                    .unwrap()
                    .with_overrides(Some("cli-host:6334".to_string()), None);

                assert_eq!(config.vector_db.host.as_deref(), Some("cli-host:6334"));
                assert_eq!(
                    config.vector_db.secrets_path,
                    PathBuf::from("/etc/env-secrets.json")
                );
            },
        );
    }
}
