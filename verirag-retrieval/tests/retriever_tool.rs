use verirag_core::SearchTool;
use verirag_retrieval::{
    HashEmbedder, InMemoryVectorStore, Retriever, RetrieverTool, TextIndexer, RETRIEVER_TOOL_NAME,
};

const CORPUS: &str = "\
Tokio is an asynchronous runtime for the Rust programming language.

Axum is a web framework built on top of tokio and hyper.

Sourdough bread needs a starter, flour, water and salt.";

async fn tool_over(corpus: &str, top_k: usize) -> RetrieverTool<HashEmbedder, InMemoryVectorStore> {
    let embedder = HashEmbedder::new(128);
    let store = InMemoryVectorStore::new();
    let indexer = TextIndexer::new(embedder.clone(), store.clone());
    indexer.index_text("corpus.txt", corpus).await.unwrap();
    RetrieverTool::new(Retriever::new(embedder, store)).with_top_k(top_k)
}

#[tokio::test]
async fn tool_is_named_retrieve_documents() {
    let tool = tool_over(CORPUS, 1).await;
    assert_eq!(tool.name(), RETRIEVER_TOOL_NAME);
    assert_eq!(tool.name(), "retrieve_documents");
}

#[tokio::test]
async fn best_matching_paragraph_comes_first() {
    let tool = tool_over(CORPUS, 1).await;
    let content = tool.search("what is sourdough bread made of").await.unwrap();
    assert!(content.starts_with("Sourdough bread"));
}

#[tokio::test]
async fn snippets_are_joined_by_blank_line() {
    let tool = tool_over(CORPUS, 2).await;
    let content = tool.search("tokio runtime").await.unwrap();
    assert_eq!(content.split("\n\n").count(), 2);
    assert!(content.contains("Tokio is an asynchronous runtime"));
}

#[tokio::test]
async fn empty_index_returns_empty_content() {
    let tool = tool_over("", 4).await;
    assert_eq!(tool.search("anything").await.unwrap(), "");
}

#[tokio::test]
async fn index_dir_reads_text_and_markdown_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "first\n\nsecond").unwrap();
    std::fs::write(dir.path().join("b.md"), "# third").unwrap();
    std::fs::write(dir.path().join("c.bin"), "ignored").unwrap();

    let store = InMemoryVectorStore::new();
    let indexer = TextIndexer::new(HashEmbedder::default(), store.clone());
    let added = indexer.index_dir(dir.path()).await.unwrap();

    assert_eq!(added, 3);
    assert_eq!(store.len().await, 3);
}
