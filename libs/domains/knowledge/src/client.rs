use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::credentials::ApiKey;
use crate::error::ClientError;
use crate::policy::NetworkPolicy;

/// Source tag attached to every client built by this crate.
pub const DEFAULT_SOURCE_TAG: &str = "embedding-vector-service";

/// One stored vector as seen by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl VectorRecord {
    pub fn new(id: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            values,
            payload: serde_json::Map::new(),
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Map<String, serde_json::Value>) -> Self {
        self.payload = payload;
        self
    }
}

/// A query hit, as ranked by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub record: VectorRecord,
    pub score: f32,
}

/// Capability surface of the remote vector database.
///
/// Every call addresses a `(namespace, index)` pair. Implementations own the
/// similarity metric and ranking; `query` returns hits most similar first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStoreClient: Send + Sync {
    async fn list_indexes(&self) -> Result<Vec<String>, ClientError>;

    /// Insert or overwrite by id.
    async fn upsert(
        &self,
        namespace: &str,
        index: &str,
        record: VectorRecord,
    ) -> Result<(), ClientError>;

    async fn query(
        &self,
        namespace: &str,
        index: &str,
        embedding: Vec<f32>,
        top_k: u64,
    ) -> Result<Vec<ScoredRecord>, ClientError>;

    async fn fetch(
        &self,
        namespace: &str,
        index: &str,
        id: &str,
    ) -> Result<Option<VectorRecord>, ClientError>;

    /// Deleting an unknown id succeeds.
    async fn delete(&self, namespace: &str, index: &str, id: &str) -> Result<(), ClientError>;

    /// Release transport resources. Called once by the connection manager.
    async fn close(&self) -> Result<(), ClientError> {
        Ok(())
    }
}

impl std::fmt::Debug for dyn VectorStoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VectorStoreClient")
    }
}

/// Shared, live client. Owned by the connection manager.
pub type ClientHandle = Arc<dyn VectorStoreClient>;

/// Everything a factory needs to build a client.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_key: ApiKey,
    pub policy: NetworkPolicy,
    pub host: Option<String>,
    pub source_tag: Option<String>,
}

/// Builds client handles. Construction must not contact the remote service.
pub trait ClientFactory: Send + Sync {
    fn build(&self, settings: &ClientSettings) -> Result<ClientHandle, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_debug_is_opaque() {
        let handle: ClientHandle = Arc::new(MockVectorStoreClient::new());
        assert_eq!(format!("{:?}", handle), "VectorStoreClient");

        let result: Result<ClientHandle, ClientError> = Err(ClientError::build("bad host"));
        assert_eq!(result.unwrap_err().to_string(), "client build error: bad host");
    }
}
