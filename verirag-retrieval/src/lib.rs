mod error;
mod hash_embedder;
mod in_memory;
mod indexer;
mod retriever;
mod tool;

pub use error::{RetrievalError, RetrievalResult};
pub use hash_embedder::HashEmbedder;
pub use in_memory::InMemoryVectorStore;
pub use indexer::{split_paragraphs, TextIndexer};
pub use retriever::Retriever;
pub use tool::{RetrieverTool, RETRIEVER_TOOL_NAME};
