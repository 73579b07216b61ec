//! End-to-end flows over the in-memory store.

use std::io::Write;

use domain_knowledge::{
    chunk_by_section, ConnectionError, ConnectionManager, ConnectionState, CredentialError,
    ImageKnowledge, ImageKnowledgeRepository, IndexBinding, InMemoryClientFactory,
    JsonFileCredentials, KnowledgeError, KnowledgeRepository, StaticCredentials, TextChunk,
    TextKnowledge, TextKnowledgeRepository, VectorDbConfig, VectorStoreClient,
};
use tempfile::NamedTempFile;

fn manager(factory: &InMemoryClientFactory) -> ConnectionManager {
    ConnectionManager::new(StaticCredentials::new("pk-test").unwrap(), factory.clone())
}

fn small_text_repo(manager: &ConnectionManager) -> TextKnowledgeRepository {
    TextKnowledgeRepository::from_manager(manager, IndexBinding::new("text", "text-embeddings", 2))
        .unwrap()
}

#[tokio::test]
async fn test_save_then_find_returns_same_item() {
    let factory = InMemoryClientFactory::new();
    let manager = manager(&factory);
    let repo = small_text_repo(&manager);

    let id = repo
        .save(TextKnowledge::new("a", vec![0.1, 0.2], "hello"))
        .await
        .unwrap();
    assert_eq!(id, "a");

    let found = repo.find_by_id("a").await.unwrap();
    assert_eq!(found.text, "hello");
    assert_eq!(found.embedding, vec![0.1, 0.2]);
}

#[tokio::test]
async fn test_save_overwrites_existing_id() {
    let factory = InMemoryClientFactory::new();
    let manager = manager(&factory);
    let repo = small_text_repo(&manager);

    repo.save(TextKnowledge::new("a", vec![0.1, 0.2], "first"))
        .await
        .unwrap();
    repo.save(TextKnowledge::new("a", vec![0.3, 0.4], "second"))
        .await
        .unwrap();

    assert_eq!(repo.find_by_id("a").await.unwrap().text, "second");
}

#[tokio::test]
async fn test_delete_then_find_is_not_found() {
    let factory = InMemoryClientFactory::new();
    let manager = manager(&factory);
    let repo = small_text_repo(&manager);

    repo.save(TextKnowledge::new("a", vec![0.1, 0.2], "hello"))
        .await
        .unwrap();
    repo.delete("a").await.unwrap();

    let err = repo.find_by_id("a").await.unwrap_err();
    assert!(matches!(err, KnowledgeError::NotFound(ref id) if id == "a"));
}

#[tokio::test]
async fn test_delete_unknown_id_succeeds() {
    let factory = InMemoryClientFactory::new();
    let manager = manager(&factory);
    let repo = small_text_repo(&manager);

    repo.delete("never-saved").await.unwrap();
}

#[tokio::test]
async fn test_search_is_bounded_and_ordered() {
    let factory = InMemoryClientFactory::new();
    let manager = manager(&factory);
    let repo = small_text_repo(&manager);

    let items = [
        ("east", vec![1.0, 0.0]),
        ("north-east", vec![0.7, 0.7]),
        ("north", vec![0.0, 1.0]),
        ("west", vec![-1.0, 0.0]),
        ("south-east", vec![0.7, -0.7]),
    ];
    for (id, embedding) in items {
        repo.save(TextKnowledge::new(id, embedding, id)).await.unwrap();
    }

    let hits = repo.search_scored(&[1.0, 0.1], 3).await.unwrap();

    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].item.id, "east");
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(hits.iter().all(|hit| hit.item.id != "west"));

    let plain = repo.search_similar(&[1.0, 0.1], 10).await.unwrap();
    assert_eq!(plain.len(), 5);
}

#[tokio::test]
async fn test_namespaces_are_isolated() {
    let factory = InMemoryClientFactory::new();
    let manager = manager(&factory);
    let client = manager.get_client().unwrap();

    let texts = TextKnowledgeRepository::new(&client, IndexBinding::new("text", "shared", 2));
    let images = ImageKnowledgeRepository::new(&client, IndexBinding::new("image", "shared", 2));

    texts
        .save(TextKnowledge::new("same-id", vec![1.0, 0.0], "a text"))
        .await
        .unwrap();
    images
        .save(ImageKnowledge::new("same-id", vec![1.0, 0.0], "s3://bucket/a.png"))
        .await
        .unwrap();

    assert_eq!(texts.find_by_id("same-id").await.unwrap().text, "a text");
    assert_eq!(
        images.find_by_id("same-id").await.unwrap().image_uri,
        "s3://bucket/a.png"
    );

    texts.delete("same-id").await.unwrap();
    assert!(images.find_by_id("same-id").await.is_ok());
}

#[tokio::test]
async fn test_repository_fails_after_shutdown() {
    let factory = InMemoryClientFactory::new();
    let manager = manager(&factory);
    let repo = small_text_repo(&manager);

    repo.save(TextKnowledge::new("a", vec![0.1, 0.2], "hello"))
        .await
        .unwrap();
    manager.shutdown().await;

    assert_eq!(manager.state(), ConnectionState::Uninitialized);
    assert!(matches!(
        repo.find_by_id("a").await,
        Err(KnowledgeError::ConnectionClosed)
    ));

    // A fresh repository over a rebuilt handle still sees the data.
    let rebuilt = small_text_repo(&manager);
    assert_eq!(rebuilt.find_by_id("a").await.unwrap().text, "hello");
    assert_eq!(factory.build_count(), 2);
}

#[tokio::test]
async fn test_missing_secrets_file_fails_without_building() {
    let dir = tempfile::tempdir().unwrap();
    let config = VectorDbConfig::new(dir.path().join("secrets.json"));
    let factory = InMemoryClientFactory::new();
    let manager = ConnectionManager::from_config(&config, factory.clone());

    let err = manager.get_client().unwrap_err();

    assert!(matches!(
        err,
        ConnectionError::Credential(CredentialError::Missing(_))
    ));
    assert_eq!(factory.build_count(), 0);
    assert!(!manager.test_connection().await);
}

#[tokio::test]
async fn test_secrets_file_key_builds_client() {
    let mut secrets = NamedTempFile::new().unwrap();
    write!(secrets, r#"{{"key": "pk-from-file"}}"#).unwrap();

    let factory = InMemoryClientFactory::new().with_index("text-embeddings");
    let manager = ConnectionManager::new(JsonFileCredentials::new(secrets.path()), factory.clone());

    assert!(manager.test_connection().await);
    assert!(manager.is_ready());
    assert_eq!(
        manager.get_client().unwrap().list_indexes().await.unwrap(),
        vec!["text-embeddings".to_string()]
    );
}

#[tokio::test]
async fn test_chunked_statute_is_searchable() {
    let factory = InMemoryClientFactory::new();
    let manager = manager(&factory);
    let repo = small_text_repo(&manager);

    let statute = "§ 1 Scope\nApplies to all.\n§ 2 Definitions\nTerms.";
    let chunks = TextChunk::records(chunk_by_section(statute), Some("law"));
    assert_eq!(chunks.len(), 2);

    for (chunk, embedding) in chunks.into_iter().zip([vec![1.0, 0.0], vec![0.0, 1.0]]) {
        repo.save(chunk.into_knowledge(embedding)).await.unwrap();
    }

    let best = repo.search_similar(&[0.1, 0.9], 1).await.unwrap();
    assert_eq!(best.len(), 1);
    assert_eq!(best[0].id, "rec2");
    assert!(best[0].text.starts_with("§ 2"));
}

#[tokio::test]
async fn test_non_finite_metadata_is_not_persisted() {
    let factory = InMemoryClientFactory::new();
    let manager = manager(&factory);
    let repo = small_text_repo(&manager);

    let err = repo
        .save(TextKnowledge::new("a", vec![0.1, 0.2], "hello").with_metadata("score", f64::NAN))
        .await
        .unwrap_err();
    assert!(matches!(err, KnowledgeError::InvalidArgument(_)));

    assert!(matches!(
        repo.find_by_id("a").await,
        Err(KnowledgeError::NotFound(_))
    ));
}
