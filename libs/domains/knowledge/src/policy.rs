use std::time::Duration;

use core_config::{env_flag, env_parse, ConfigError, FromEnv};

use crate::error::ConnectionError;

/// Transport settings applied when the client handle is built.
///
/// This is a plain value. Once a [`crate::ConnectionManager`] has built a
/// handle from it, the manager refuses replacements until `shutdown()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPolicy {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub retry_on_connection_failure: bool,
    pub tls_enabled: bool,
}

impl NetworkPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_retry_on_connection_failure(mut self, retry: bool) -> Self {
        self.retry_on_connection_failure = retry;
        self
    }

    /// Plaintext transport. Only for local development against a sidecar.
    pub fn without_tls(mut self) -> Self {
        self.tls_enabled = false;
        self
    }

    /// The single per-request deadline handed to transports that do not
    /// distinguish read and write.
    pub fn request_timeout(&self) -> Duration {
        self.read_timeout.max(self.write_timeout)
    }

    pub fn validate(&self) -> Result<(), ConnectionError> {
        for (name, value) in [
            ("connect_timeout", self.connect_timeout),
            ("read_timeout", self.read_timeout),
            ("write_timeout", self.write_timeout),
        ] {
            if value.is_zero() {
                return Err(ConnectionError::Configuration(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }
}

impl Default for NetworkPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(60),
            retry_on_connection_failure: true,
            tls_enabled: true,
        }
    }
}

/// Load a NetworkPolicy from environment variables
///
/// Environment variables (all optional, defaults in parentheses):
/// - `VECTOR_DB_CONNECT_TIMEOUT_SECS` (30)
/// - `VECTOR_DB_READ_TIMEOUT_SECS` (60)
/// - `VECTOR_DB_WRITE_TIMEOUT_SECS` (60)
/// - `VECTOR_DB_RETRY_ON_CONNECTION_FAILURE` (true)
/// - `VECTOR_DB_TLS_ENABLED` (true)
impl FromEnv for NetworkPolicy {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            connect_timeout: Duration::from_secs(env_parse(
                "VECTOR_DB_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout.as_secs(),
            )?),
            read_timeout: Duration::from_secs(env_parse(
                "VECTOR_DB_READ_TIMEOUT_SECS",
                defaults.read_timeout.as_secs(),
            )?),
            write_timeout: Duration::from_secs(env_parse(
                "VECTOR_DB_WRITE_TIMEOUT_SECS",
                defaults.write_timeout.as_secs(),
            )?),
            retry_on_connection_failure: env_flag(
                "VECTOR_DB_RETRY_ON_CONNECTION_FAILURE",
                defaults.retry_on_connection_failure,
            )?,
            tls_enabled: env_flag("VECTOR_DB_TLS_ENABLED", defaults.tls_enabled)?,
        })
    }
}
