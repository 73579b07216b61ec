//! Process-local vector store.
//!
//! Stands in for the remote service in tests and local runs. All clients
//! built by one [`InMemoryClientFactory`] share the same data, so a rebuilt
//! handle sees what an earlier handle wrote.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::client::{
    ClientFactory, ClientHandle, ClientSettings, ScoredRecord, VectorRecord, VectorStoreClient,
};
use crate::error::ClientError;

/// index -> namespace -> id -> record
type Indexes = HashMap<String, HashMap<String, HashMap<String, VectorRecord>>>;

#[derive(Default)]
struct StoreData {
    declared: BTreeSet<String>,
    indexes: Indexes,
}

/// A client handle over shared in-memory data.
pub struct InMemoryVectorStore {
    data: Arc<RwLock<StoreData>>,
    closed: AtomicBool,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(StoreData::default())),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> Result<(), ClientError> {
        if self.is_closed() {
            Err(ClientError::connection("client has been closed"))
        } else {
            Ok(())
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Cosine similarity; zero vectors and length mismatches score 0.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl VectorStoreClient for InMemoryVectorStore {
    async fn list_indexes(&self) -> Result<Vec<String>, ClientError> {
        self.ensure_open()?;
        let data = self.read();

        let mut names: BTreeSet<String> = data.declared.clone();
        names.extend(data.indexes.keys().cloned());
        Ok(names.into_iter().collect())
    }

    async fn upsert(
        &self,
        namespace: &str,
        index: &str,
        record: VectorRecord,
    ) -> Result<(), ClientError> {
        self.ensure_open()?;
        let mut data = self.write();

        data.indexes
            .entry(index.to_string())
            .or_default()
            .entry(namespace.to_string())
            .or_default()
            .insert(record.id.clone(), record);
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        index: &str,
        embedding: Vec<f32>,
        top_k: u64,
    ) -> Result<Vec<ScoredRecord>, ClientError> {
        self.ensure_open()?;
        let data = self.read();

        let Some(records) = data.indexes.get(index).and_then(|ns| ns.get(namespace)) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<ScoredRecord> = records
            .values()
            .map(|record| ScoredRecord {
                score: cosine_similarity(&embedding, &record.values),
                record: record.clone(),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(CmpOrdering::Equal)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        hits.truncate(usize::try_from(top_k).unwrap_or(usize::MAX));
        Ok(hits)
    }

    async fn fetch(
        &self,
        namespace: &str,
        index: &str,
        id: &str,
    ) -> Result<Option<VectorRecord>, ClientError> {
        self.ensure_open()?;
        let data = self.read();

        Ok(data
            .indexes
            .get(index)
            .and_then(|ns| ns.get(namespace))
            .and_then(|records| records.get(id))
            .cloned())
    }

    async fn delete(&self, namespace: &str, index: &str, id: &str) -> Result<(), ClientError> {
        self.ensure_open()?;
        let mut data = self.write();

        if let Some(records) = data
            .indexes
            .get_mut(index)
            .and_then(|ns| ns.get_mut(namespace))
        {
            records.remove(id);
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Builds [`InMemoryVectorStore`] handles over one shared dataset and counts
/// how many were built.
#[derive(Clone, Default)]
pub struct InMemoryClientFactory {
    data: Arc<RwLock<StoreData>>,
    builds: Arc<AtomicUsize>,
}

impl InMemoryClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an index up front so `list_indexes` reports it before any write.
    pub fn with_index(self, name: impl Into<String>) -> Self {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .declared
            .insert(name.into());
        self
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl ClientFactory for InMemoryClientFactory {
    fn build(&self, _settings: &ClientSettings) -> Result<ClientHandle, ClientError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(InMemoryVectorStore {
            data: Arc::clone(&self.data),
            closed: AtomicBool::new(false),
        }))
    }
}
