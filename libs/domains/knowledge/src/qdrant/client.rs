use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, DeletePointsBuilder, Filter, GetPointsBuilder, PointStruct, PointsIdsList,
    SearchPointsBuilder, UpsertPointsBuilder,
};
use qdrant_client::config::QdrantConfig;
use qdrant_client::{Qdrant, QdrantError};
use tracing::{debug, info};

use super::conversions::{
    extract_vector, payload_to_record, point_id, record_to_payload, NAMESPACE_FIELD,
};
use super::retry::{retry_when, RetryConfig};
use crate::client::{
    ClientFactory, ClientHandle, ClientSettings, ScoredRecord, VectorRecord, VectorStoreClient,
};
use crate::error::ClientError;

/// Port used when no host is configured.
const DEFAULT_LOCAL_HOST: &str = "localhost:6334";

/// Request metadata key carrying the analytics source tag.
pub const SOURCE_TAG_HEADER: &str = "x-source-tag";

// gRPC status codes treated as connection failures.
const GRPC_DEADLINE_EXCEEDED: i32 = 4;
const GRPC_UNAVAILABLE: i32 = 14;

impl From<QdrantError> for ClientError {
    fn from(err: QdrantError) -> Self {
        match &err {
            QdrantError::ResponseError { status } => {
                let code = status.code() as i32;
                if code == GRPC_UNAVAILABLE || code == GRPC_DEADLINE_EXCEEDED {
                    ClientError::connection(err.to_string())
                } else {
                    ClientError::rejected(err.to_string())
                }
            }
            QdrantError::Io(_) => ClientError::connection(err.to_string()),
            QdrantError::ConversionError(_) => ClientError::decode(err.to_string()),
            QdrantError::InvalidUri(_) => ClientError::build(err.to_string()),
            _ => ClientError::rejected(err.to_string()),
        }
    }
}

/// Pick the URL scheme from the TLS flag, rejecting hosts that contradict it.
pub fn resolve_url(host: Option<&str>, tls_enabled: bool) -> Result<String, ClientError> {
    let host = host.map(str::trim).unwrap_or(DEFAULT_LOCAL_HOST);
    let wanted = if tls_enabled { "https" } else { "http" };

    match host.split_once("://") {
        Some((scheme, _)) if scheme.eq_ignore_ascii_case(wanted) => Ok(host.to_string()),
        Some((scheme, _)) => Err(ClientError::build(format!(
            "host '{}' uses scheme '{}' but TLS is {}",
            host,
            scheme,
            if tls_enabled { "enabled" } else { "disabled" }
        ))),
        None => Ok(format!("{}://{}", wanted, host)),
    }
}

/// Transport configuration for `settings`; nothing is contacted yet.
pub fn qdrant_config(settings: &ClientSettings) -> Result<QdrantConfig, ClientError> {
    let url = resolve_url(settings.host.as_deref(), settings.policy.tls_enabled)?;

    let mut config = Qdrant::from_url(&url)
        .api_key(settings.api_key.expose().to_string())
        .connect_timeout(settings.policy.connect_timeout)
        .timeout(settings.policy.request_timeout())
        .skip_compatibility_check();

    if let Some(tag) = &settings.source_tag {
        config = config.header(SOURCE_TAG_HEADER, tag.as_str());
    }

    Ok(config)
}

/// Qdrant-backed [`VectorStoreClient`]. Indexes are collections; namespaces
/// are a filtered payload field.
pub struct QdrantVectorStore {
    client: Qdrant,
    retry: Option<RetryConfig>,
}

impl QdrantVectorStore {
    pub fn connect(settings: &ClientSettings) -> Result<Self, ClientError> {
        let config = qdrant_config(settings)?;
        let url = config.uri.clone();

        let client = config
            .build()
            .map_err(|e| ClientError::build(format!("Failed to build client: {}", e)))?;

        info!(
            url = %url,
            source_tag = settings.source_tag.as_deref().unwrap_or("none"),
            retry = settings.policy.retry_on_connection_failure,
            "Qdrant client configured"
        );

        let retry = settings
            .policy
            .retry_on_connection_failure
            .then(RetryConfig::default);

        Ok(Self { client, retry })
    }

    pub fn from_client(client: Qdrant) -> Self {
        Self {
            client,
            retry: None,
        }
    }

    async fn call<T, F, Fut>(&self, operation: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, QdrantError>>,
    {
        let mut operation = operation;
        let attempt = move || {
            let fut = operation();
            async move { fut.await.map_err(ClientError::from) }
        };

        match &self.retry {
            Some(config) => retry_when(attempt, config, ClientError::is_connection).await,
            None => {
                let mut attempt = attempt;
                attempt().await
            }
        }
    }

    fn namespace_filter(namespace: &str) -> Filter {
        Filter::must([Condition::matches(NAMESPACE_FIELD, namespace.to_string())])
    }
}

#[async_trait]
impl VectorStoreClient for QdrantVectorStore {
    async fn list_indexes(&self) -> Result<Vec<String>, ClientError> {
        let client = &self.client;
        let response = self.call(|| client.list_collections()).await?;

        Ok(response
            .collections
            .into_iter()
            .map(|collection| collection.name)
            .collect())
    }

    async fn upsert(
        &self,
        namespace: &str,
        index: &str,
        record: VectorRecord,
    ) -> Result<(), ClientError> {
        let client = &self.client;
        let point = PointStruct::new(
            point_id(namespace, &record.id),
            record.values.clone(),
            record_to_payload(namespace, &record),
        );

        self.call(|| {
            client.upsert_points(UpsertPointsBuilder::new(index, vec![point.clone()]).wait(true))
        })
        .await?;

        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        index: &str,
        embedding: Vec<f32>,
        top_k: u64,
    ) -> Result<Vec<ScoredRecord>, ClientError> {
        let client = &self.client;
        let filter = Self::namespace_filter(namespace);

        let response = self
            .call(|| {
                client.search_points(
                    SearchPointsBuilder::new(index, embedding.clone(), top_k)
                        .filter(filter.clone())
                        .with_payload(true)
                        .with_vectors(true),
                )
            })
            .await?;

        response
            .result
            .into_iter()
            .map(|point| {
                let values = extract_vector(&point.vectors);
                Ok(ScoredRecord {
                    record: payload_to_record(point.payload, values)?,
                    score: point.score,
                })
            })
            .collect()
    }

    async fn fetch(
        &self,
        namespace: &str,
        index: &str,
        id: &str,
    ) -> Result<Option<VectorRecord>, ClientError> {
        let client = &self.client;
        let point = point_id(namespace, id);

        let response = self
            .call(|| {
                client.get_points(
                    GetPointsBuilder::new(index, vec![point.clone()])
                        .with_payload(true)
                        .with_vectors(true),
                )
            })
            .await?;

        response
            .result
            .into_iter()
            .next()
            .map(|point| {
                let values = extract_vector(&point.vectors);
                payload_to_record(point.payload, values)
            })
            .transpose()
    }

    async fn delete(&self, namespace: &str, index: &str, id: &str) -> Result<(), ClientError> {
        let client = &self.client;
        let point = point_id(namespace, id);

        self.call(|| {
            client.delete_points(
                DeletePointsBuilder::new(index)
                    .points(PointsIdsList {
                        ids: vec![point.clone()],
                    })
                    .wait(true),
            )
        })
        .await?;

        Ok(())
    }

    async fn close(&self) -> Result<(), ClientError> {
        // The gRPC channel is released when the last handle drops.
        debug!("Qdrant client closed");
        Ok(())
    }
}

/// Builds [`QdrantVectorStore`] handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct QdrantClientFactory;

impl ClientFactory for QdrantClientFactory {
    fn build(&self, settings: &ClientSettings) -> Result<ClientHandle, ClientError> {
        Ok(Arc::new(QdrantVectorStore::connect(settings)?))
    }
}
