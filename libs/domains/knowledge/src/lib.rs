//! Knowledge Domain Library
//!
//! Stores text and image knowledge items in a remote vector database through
//! one shared, lazily built client handle.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │ KnowledgeRepository<T>   │  ← save / find / search / delete per index
//! └────────────┬─────────────┘
//!              │ Weak<dyn VectorStoreClient>
//! ┌────────────▼─────────────┐     ┌────────────────────┐
//! │    ConnectionManager     │────▶│ CredentialProvider │
//! │ (lazy, shared, closable) │     └────────────────────┘
//! └────────────┬─────────────┘
//!              │ ClientFactory
//! ┌────────────▼─────────────┐
//! │ QdrantVectorStore        │
//! │ InMemoryVectorStore      │
//! └──────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use core_config::FromEnv;
//! use domain_knowledge::{
//!     ConnectionManager, KnowledgeRepository, QdrantClientFactory, TextKnowledge,
//!     TextKnowledgeRepository, VectorDbConfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = VectorDbConfig::from_env()?;
//! let manager = ConnectionManager::from_config(&config, QdrantClientFactory);
//!
//! let client = manager.get_client()?;
//! let texts = TextKnowledgeRepository::text(&client);
//! let id = texts
//!     .save(TextKnowledge::unsaved(vec![0.1; 1024], "§ 1 Scope"))
//!     .await?;
//! let found = texts.find_by_id(&id).await?;
//! println!("{}", found.text);
//!
//! manager.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod chunking;
pub mod client;
pub mod config;
pub mod connection;
pub mod credentials;
pub mod error;
pub mod memory;
pub mod models;
pub mod policy;
pub mod qdrant;
pub mod repository;

pub use chunking::{chunk_by_section, TextChunk};
pub use client::{
    ClientFactory, ClientHandle, ClientSettings, ScoredRecord, VectorRecord, VectorStoreClient,
};
pub use config::VectorDbConfig;
pub use connection::{ConnectionManager, ConnectionSettings, ConnectionState};
pub use credentials::{
    ApiKey, CredentialProvider, EnvCredentials, JsonFileCredentials, StaticCredentials,
};
pub use error::{
    ClientError, ClientErrorKind, ConnectionError, CredentialError, KnowledgeError,
    KnowledgeResult,
};
pub use memory::{InMemoryClientFactory, InMemoryVectorStore};
pub use models::{
    ImageKnowledge, KnowledgeItem, Metadata, MetadataValue, Scored, TextKnowledge,
};
pub use policy::NetworkPolicy;
pub use qdrant::{QdrantClientFactory, QdrantVectorStore};
pub use repository::{
    ImageKnowledgeRepository, IndexBinding, KnowledgeRepository, TextKnowledgeRepository,
    VectorKnowledgeRepository,
};
