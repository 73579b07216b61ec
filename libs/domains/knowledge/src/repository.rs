use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tracing::debug;

use crate::client::{ClientHandle, VectorStoreClient};
use crate::connection::ConnectionManager;
use crate::error::{ConnectionError, KnowledgeError, KnowledgeResult};
use crate::models::{generate_id, ImageKnowledge, KnowledgeItem, Scored, TextKnowledge};

/// Where a repository's items live and how long their embeddings are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBinding {
    pub namespace: String,
    pub index_name: String,
    pub dimension: usize,
}

impl IndexBinding {
    /// llama-text-embed-v2 output size
    pub const TEXT_DIMENSION: usize = 1024;
    /// CLIP ViT-B/32 output size
    pub const IMAGE_DIMENSION: usize = 512;

    pub fn new(namespace: impl Into<String>, index_name: impl Into<String>, dimension: usize) -> Self {
        Self {
            namespace: namespace.into(),
            index_name: index_name.into(),
            dimension,
        }
    }

    pub fn text() -> Self {
        Self::new("text", "text-embeddings", Self::TEXT_DIMENSION)
    }

    pub fn image() -> Self {
        Self::new("image", "image-embeddings", Self::IMAGE_DIMENSION)
    }

    /// Length must match the index; every component must be finite.
    pub fn check_embedding(&self, embedding: &[f32]) -> KnowledgeResult<()> {
        if embedding.len() != self.dimension {
            return Err(KnowledgeError::DimensionMismatch {
                index: self.index_name.clone(),
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        if let Some(position) = embedding.iter().position(|v| !v.is_finite()) {
            return Err(KnowledgeError::InvalidArgument(format!(
                "embedding value at position {} is not finite",
                position
            )));
        }
        Ok(())
    }
}

/// CRUD and nearest-neighbor search over one namespace/index.
///
/// Validation failures are returned before any remote call. Remote failures
/// come back as [`KnowledgeError::Repository`] and are never retried here.
#[async_trait]
pub trait KnowledgeRepository<T: KnowledgeItem>: Send + Sync {
    fn binding(&self) -> &IndexBinding;

    /// Upsert one item and return its id. A blank id is replaced with a
    /// generated one.
    async fn save(&self, item: T) -> KnowledgeResult<String>;

    async fn find_by_id(&self, id: &str) -> KnowledgeResult<T>;

    /// At most `top_k` items, most similar first.
    async fn search_similar(&self, query: &[f32], top_k: usize) -> KnowledgeResult<Vec<T>> {
        Ok(self
            .search_scored(query, top_k)
            .await?
            .into_iter()
            .map(|hit| hit.item)
            .collect())
    }

    async fn search_scored(&self, query: &[f32], top_k: usize) -> KnowledgeResult<Vec<Scored<T>>>;

    /// Deleting an id that does not exist succeeds.
    async fn delete(&self, id: &str) -> KnowledgeResult<()>;
}

/// The one repository implementation; the binding decides the namespace.
pub struct VectorKnowledgeRepository<T> {
    client: Weak<dyn VectorStoreClient>,
    binding: IndexBinding,
    _item: PhantomData<fn() -> T>,
}

pub type TextKnowledgeRepository = VectorKnowledgeRepository<TextKnowledge>;
pub type ImageKnowledgeRepository = VectorKnowledgeRepository<ImageKnowledge>;

impl<T: KnowledgeItem> VectorKnowledgeRepository<T> {
    /// The repository does not keep the client alive; once the owning
    /// manager shuts down, calls fail with [`KnowledgeError::ConnectionClosed`].
    pub fn new(client: &ClientHandle, binding: IndexBinding) -> Self {
        Self {
            client: Arc::downgrade(client),
            binding,
            _item: PhantomData,
        }
    }

    pub fn from_manager(
        manager: &ConnectionManager,
        binding: IndexBinding,
    ) -> Result<Self, ConnectionError> {
        Ok(Self::new(&manager.get_client()?, binding))
    }

    fn client(&self) -> KnowledgeResult<ClientHandle> {
        self.client.upgrade().ok_or(KnowledgeError::ConnectionClosed)
    }

    fn require_id(id: &str) -> KnowledgeResult<()> {
        if id.trim().is_empty() {
            return Err(KnowledgeError::InvalidArgument("id must not be blank".to_string()));
        }
        Ok(())
    }
}

impl TextKnowledgeRepository {
    pub fn text(client: &ClientHandle) -> Self {
        Self::new(client, IndexBinding::text())
    }
}

impl ImageKnowledgeRepository {
    pub fn image(client: &ClientHandle) -> Self {
        Self::new(client, IndexBinding::image())
    }
}

#[async_trait]
impl<T: KnowledgeItem> KnowledgeRepository<T> for VectorKnowledgeRepository<T> {
    fn binding(&self) -> &IndexBinding {
        &self.binding
    }

    async fn save(&self, mut item: T) -> KnowledgeResult<String> {
        self.binding.check_embedding(item.embedding())?;

        if item.id().trim().is_empty() {
            item.set_id(generate_id());
        }
        let id = item.id().to_string();
        let record = item.into_record()?;

        self.client()?
            .upsert(&self.binding.namespace, &self.binding.index_name, record)
            .await?;

        debug!(
            namespace = %self.binding.namespace,
            index = %self.binding.index_name,
            id = %id,
            "Saved knowledge item"
        );
        Ok(id)
    }

    async fn find_by_id(&self, id: &str) -> KnowledgeResult<T> {
        Self::require_id(id)?;

        let record = self
            .client()?
            .fetch(&self.binding.namespace, &self.binding.index_name, id)
            .await?
            .ok_or_else(|| KnowledgeError::NotFound(id.to_string()))?;

        T::from_record(record)
    }

    async fn search_scored(&self, query: &[f32], top_k: usize) -> KnowledgeResult<Vec<Scored<T>>> {
        if top_k == 0 {
            return Err(KnowledgeError::InvalidArgument(
                "top_k must be greater than zero".to_string(),
            ));
        }
        self.binding.check_embedding(query)?;

        let hits = self
            .client()?
            .query(
                &self.binding.namespace,
                &self.binding.index_name,
                query.to_vec(),
                top_k as u64,
            )
            .await?;

        debug!(
            namespace = %self.binding.namespace,
            index = %self.binding.index_name,
            top_k,
            hits = hits.len(),
            "Similarity search finished"
        );

        hits.into_iter()
            .take(top_k)
            .map(|hit| {
                Ok(Scored {
                    item: T::from_record(hit.record)?,
                    score: hit.score,
                })
            })
            .collect()
    }

    async fn delete(&self, id: &str) -> KnowledgeResult<()> {
        Self::require_id(id)?;

        self.client()?
            .delete(&self.binding.namespace, &self.binding.index_name, id)
            .await?;

        debug!(namespace = %self.binding.namespace, id = %id, "Deleted knowledge item");
        Ok(())
    }
}
