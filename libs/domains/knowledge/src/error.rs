use thiserror::Error;

/// Failure to resolve the API key.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Credential missing: {0}")]
    Missing(String),

    #[error("Credential source malformed: {0}")]
    Malformed(String),
}

/// Failure reported by the remote vector store client.
///
/// `kind` separates connection-class failures (retryable by the transport)
/// from everything else.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct ClientError {
    pub kind: ClientErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// The remote host could not be reached.
    Connection,
    /// The remote service rejected the request (auth, quota, bad request).
    Rejected,
    /// The client could not be constructed from the given settings.
    Build,
    /// The remote answered with something we could not decode.
    Decode,
}

impl std::fmt::Display for ClientErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ClientErrorKind::Connection => "connection error",
            ClientErrorKind::Rejected => "request rejected",
            ClientErrorKind::Build => "client build error",
            ClientErrorKind::Decode => "decode error",
        };
        f.write_str(label)
    }
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Connection, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Rejected, message)
    }

    pub fn build(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Build, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Decode, message)
    }

    pub fn is_connection(&self) -> bool {
        self.kind == ClientErrorKind::Connection
    }
}

/// Errors raised while constructing or managing the shared client handle.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Vector store client could not be created: {0}")]
    ClientInit(#[source] ClientError),

    #[error("Network policy is frozen while a client handle is live; call shutdown() first")]
    PolicyFrozen,
}

/// Errors raised by knowledge repositories.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Embedding dimension mismatch for index '{index}': expected {expected}, got {actual}")]
    DimensionMismatch {
        index: String,
        expected: usize,
        actual: usize,
    },

    #[error("Knowledge item not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Vector store request failed: {0}")]
    Repository(#[from] ClientError),

    #[error("Stored payload could not be decoded: {0}")]
    Payload(String),

    #[error("Connection handle was shut down")]
    ConnectionClosed,
}

pub type KnowledgeResult<T> = Result<T, KnowledgeError>;

impl From<serde_json::Error> for KnowledgeError {
    fn from(err: serde_json::Error) -> Self {
        KnowledgeError::Payload(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display_includes_kind() {
        let err = ClientError::connection("tcp connect refused");
        assert_eq!(err.to_string(), "connection error: tcp connect refused");
        assert!(err.is_connection());
        assert!(!ClientError::rejected("quota").is_connection());
    }

    #[test]
    fn test_repository_error_preserves_cause() {
        let err = KnowledgeError::from(ClientError::rejected("invalid api key"));
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("request rejected: invalid api key"));
    }

    #[test]
    fn test_credential_error_is_transparent_in_connection_error() {
        let err = ConnectionError::from(CredentialError::Missing("secrets.json".to_string()));
        assert_eq!(err.to_string(), "Credential missing: secrets.json");
    }
}
