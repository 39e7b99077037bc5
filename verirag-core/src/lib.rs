mod agent_event;
mod document;
mod embedding;
mod error;
mod llm;
mod output_parsers;
mod runnable;
mod search;
mod value;
mod vector_store;

pub use agent_event::AgentEvent;
pub use document::Document;
pub use embedding::Embedding;
pub use error::{EmbeddingError, StoreError, VeriragError};
pub use llm::{Llm, LlmRequest, LlmResponse, Message, ResponseFormat, Role};
pub use output_parsers::{StrOutputParser, StructuredOutputParser};
pub use runnable::{Runnable, StreamEvent};
pub use search::SearchTool;
pub use value::{IntoValue, TryFromValue, Value};
pub use vector_store::{SearchResult, VectorStore};
