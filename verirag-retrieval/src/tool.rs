use async_trait::async_trait;
use verirag_core::{Embedding, SearchTool, VectorStore, VeriragError};

use crate::Retriever;

pub const RETRIEVER_TOOL_NAME: &str = "retrieve_documents";
const DEFAULT_TOP_K: usize = 4;

/// Exposes a [`Retriever`] as the conversation's search tool. Ranked chunk
/// contents are joined with a blank line; no hits yields an empty string.
pub struct RetrieverTool<E, S> {
    retriever: Retriever<E, S>,
    top_k: usize,
}

impl<E, S> RetrieverTool<E, S>
where
    E: Embedding,
    S: VectorStore,
{
    pub fn new(retriever: Retriever<E, S>) -> Self {
        Self {
            retriever,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }
}

#[async_trait]
impl<E, S> SearchTool for RetrieverTool<E, S>
where
    E: Embedding,
    S: VectorStore,
{
    fn name(&self) -> &str {
        RETRIEVER_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Search and return information from the indexed documents."
    }

    async fn search(&self, query: &str) -> Result<String, VeriragError> {
        let results = self
            .retriever
            .retrieve(query, self.top_k)
            .await
            .map_err(|err| VeriragError::ToolCallFailed {
                tool_name: RETRIEVER_TOOL_NAME.to_string(),
                reason: err.to_string(),
            })?;

        tracing::debug!(hits = results.len(), "retrieved documents");
        Ok(results
            .into_iter()
            .map(|result| result.document.content)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}
