use std::path::Path;

use verirag_core::{Document, Embedding, Value, VectorStore};

use crate::RetrievalError;

const INDEXED_EXTENSIONS: &[&str] = &["txt", "md"];

/// Embeds plain-text documents and adds them to a store, one document per
/// paragraph (blocks separated by a blank line).
pub struct TextIndexer<E, S> {
    embedder: E,
    store: S,
}

impl<E, S> TextIndexer<E, S>
where
    E: Embedding,
    S: VectorStore,
{
    pub fn new(embedder: E, store: S) -> Self {
        Self { embedder, store }
    }

    pub async fn add_documents(&self, docs: Vec<Document>) -> Result<usize, RetrievalError> {
        for doc in &docs {
            if doc.id.trim().is_empty() {
                return Err(RetrievalError::InvalidId(doc.id.clone()));
            }
        }
        if docs.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = docs.iter().map(|doc| doc.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        let docs_with_embeddings: Vec<Document> = docs
            .into_iter()
            .zip(embeddings)
            .map(|(mut doc, embedding)| {
                doc.embedding = Some(embedding);
                doc
            })
            .collect();

        let count = docs_with_embeddings.len();
        self.store.add(docs_with_embeddings).await?;
        Ok(count)
    }

    /// Splits `text` into paragraphs with ids `<source>#<n>` and indexes them.
    pub async fn index_text(&self, source: &str, text: &str) -> Result<usize, RetrievalError> {
        self.add_documents(split_paragraphs(source, text)).await
    }

    /// Indexes every `.txt` and `.md` file directly under `dir`, in name order.
    pub async fn index_dir(&self, dir: impl AsRef<Path>) -> Result<usize, RetrievalError> {
        let dir = dir.as_ref();
        let io_error = |source| RetrievalError::Io {
            path: dir.display().to_string(),
            source,
        };

        let mut entries = tokio::fs::read_dir(dir).await.map_err(io_error)?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            let indexed = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| INDEXED_EXTENSIONS.contains(&ext))
                .unwrap_or(false);
            if indexed {
                paths.push(path);
            }
        }
        paths.sort();

        let mut total = 0;
        for path in paths {
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| RetrievalError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
            let source = path.to_string_lossy();
            let added = self.index_text(&source, &text).await?;
            tracing::debug!(source = %source, paragraphs = added, "indexed file");
            total += added;
        }
        Ok(total)
    }
}

pub fn split_paragraphs(source: &str, text: &str) -> Vec<Document> {
    let normalized = text.replace("\r\n", "\n");
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();
    for line in normalized.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }

    paragraphs
        .into_iter()
        .enumerate()
        .map(|(idx, content)| {
            let mut doc = Document::new(format!("{source}#{idx}"), content);
            doc.metadata
                .insert("source".to_string(), Value::String(source.to_string()));
            doc
        })
        .collect()
}
