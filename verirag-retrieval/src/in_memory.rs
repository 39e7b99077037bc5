use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;
use verirag_core::{Document, SearchResult, StoreError, VectorStore};

const SOURCE_KEY: &str = "source";

#[derive(Default)]
struct StoreInner {
    docs: Vec<Option<Document>>,
    embeddings: Vec<Option<Vec<f32>>>,
    id_map: HashMap<String, usize>,
    dimension: Option<usize>,
}

/// Brute-force cosine store. Cloning shares the underlying index.
#[derive(Clone, Default)]
pub struct InMemoryVectorStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.id_map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Distinct `source` metadata values of the stored documents, sorted.
    pub async fn sources(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        let sources: BTreeSet<&str> = inner
            .docs
            .iter()
            .flatten()
            .filter_map(|doc| doc.metadata.get(SOURCE_KEY)?.as_str())
            .collect();
        sources.into_iter().map(str::to_string).collect()
    }

    /// Drops every document whose `source` metadata equals `source`.
    pub async fn delete_source(&self, source: &str) -> usize {
        let mut inner = self.inner.write().await;
        let indices: Vec<usize> = inner
            .docs
            .iter()
            .enumerate()
            .filter_map(|(idx, doc)| {
                let matches = doc.as_ref()?.metadata.get(SOURCE_KEY)?.as_str() == Some(source);
                matches.then_some(idx)
            })
            .collect();
        for &idx in &indices {
            if let Some(doc) = inner.docs[idx].take() {
                inner.id_map.remove(&doc.id);
            }
            inner.embeddings[idx] = None;
        }
        indices.len()
    }
}

#[async_trait::async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, docs: Vec<Document>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for mut doc in docs {
            if doc.id.trim().is_empty() {
                return Err(StoreError::InvalidId(doc.id));
            }

            let embedding = doc
                .embedding
                .take()
                .ok_or_else(|| StoreError::MissingEmbedding(doc.id.clone()))?;
            let dimension = embedding.len();
            match inner.dimension {
                Some(expected) if expected != dimension => {
                    return Err(StoreError::DimensionMismatch {
                        expected,
                        got: dimension,
                    });
                }
                None => inner.dimension = Some(dimension),
                _ => {}
            }

            if let Some(&index) = inner.id_map.get(&doc.id) {
                inner.docs[index] = Some(doc);
                inner.embeddings[index] = Some(embedding);
            } else {
                let index = inner.docs.len();
                inner.id_map.insert(doc.id.clone(), index);
                inner.docs.push(Some(doc));
                inner.embeddings.push(Some(embedding));
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>, StoreError> {
        let inner = self.inner.read().await;
        let expected = inner.dimension.unwrap_or(query_embedding.len());
        if expected != query_embedding.len() {
            return Err(StoreError::DimensionMismatch {
                expected,
                got: query_embedding.len(),
            });
        }

        let mut scored: Vec<SearchResult> = inner
            .embeddings
            .iter()
            .zip(inner.docs.iter())
            .filter_map(|(embedding, doc)| Some((embedding.as_ref()?, doc.as_ref()?)))
            .map(|(embedding, doc)| {
                let score = cosine_similarity(query_embedding, embedding);
                SearchResult {
                    document: doc.clone(),
                    score: if score.is_nan() { f32::NEG_INFINITY } else { score },
                }
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for id in ids {
            if let Some(idx) = inner.id_map.remove(id) {
                inner.docs[idx] = None;
                inner.embeddings[idx] = None;
            }
        }
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
