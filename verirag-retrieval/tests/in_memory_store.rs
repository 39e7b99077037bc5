use verirag_core::{Document, VectorStore};
use verirag_retrieval::InMemoryVectorStore;

fn embedded(id: &str, embedding: Vec<f32>) -> Document {
    let mut doc = Document::new(id, id);
    doc.embedding = Some(embedding);
    doc
}

#[tokio::test]
async fn in_memory_store_ranks_by_cosine_similarity() {
    let store = InMemoryVectorStore::new();
    store
        .add(vec![
            embedded("a", vec![1.0, 0.0, 0.0]),
            embedded("b", vec![0.0, 1.0, 0.0]),
            embedded("c", vec![0.7, 0.7, 0.0]),
        ])
        .await
        .unwrap();

    let results = store.search(&[1.0, 0.0, 0.0], 2).await.unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.document.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
    assert!(results[0].document.embedding.is_none());
}

#[tokio::test]
async fn in_memory_store_dimension_mismatch_on_add() {
    let store = InMemoryVectorStore::new();
    store.add(vec![embedded("a", vec![1.0, 0.0])]).await.unwrap();

    let err = store
        .add(vec![embedded("b", vec![1.0, 0.0, 0.0])])
        .await
        .unwrap_err();
    assert!(format!("{err}").contains("dimension mismatch"));
}

#[tokio::test]
async fn in_memory_store_requires_embeddings() {
    let store = InMemoryVectorStore::new();
    let err = store.add(vec![Document::new("a", "a")]).await.unwrap_err();
    assert!(format!("{err}").contains("missing embedding"));
}

#[tokio::test]
async fn in_memory_store_duplicate_ids_overwrite_and_delete_removes() {
    let store = InMemoryVectorStore::new();
    store.add(vec![embedded("a", vec![1.0, 0.0])]).await.unwrap();
    let mut replacement = embedded("a", vec![1.0, 0.0]);
    replacement.content = "second".to_string();
    store.add(vec![replacement]).await.unwrap();
    assert_eq!(store.len().await, 1);

    let results = store.search(&[1.0, 0.0], 5).await.unwrap();
    assert_eq!(results[0].document.content, "second");

    store.delete(&["a".to_string()]).await.unwrap();
    assert!(store.is_empty().await);
    assert!(store.search(&[1.0, 0.0], 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn sources_are_listed_once_and_can_be_dropped() {
    let store = InMemoryVectorStore::new();
    let indexer = verirag_retrieval::TextIndexer::new(
        verirag_retrieval::HashEmbedder::default(),
        store.clone(),
    );
    indexer
        .index_text("rivers.md", "The Seine.\n\nThe Danube.")
        .await
        .unwrap();
    indexer.index_text("capitals.txt", "Paris.").await.unwrap();
    store.add(vec![embedded("loose", vec![1.0; 256])]).await.unwrap();

    assert_eq!(store.sources().await, vec!["capitals.txt", "rivers.md"]);

    assert_eq!(store.delete_source("rivers.md").await, 2);
    assert_eq!(store.sources().await, vec!["capitals.txt"]);
    assert_eq!(store.delete_source("rivers.md").await, 0);
}
