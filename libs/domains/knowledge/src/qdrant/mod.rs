//! Qdrant implementation of [`VectorStoreClient`](crate::client::VectorStoreClient).

pub mod client;
pub mod conversions;
pub mod retry;

pub use client::{QdrantClientFactory, QdrantVectorStore};
pub use retry::RetryConfig;
