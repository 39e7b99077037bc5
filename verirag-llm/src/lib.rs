//! Chat completion clients for OpenAI-compatible endpoints.

pub mod openai_compatible;

pub use openai_compatible::{
    parse_sse_line, ChatCompletionRequest, OpenAiCompatibleBuilder, OpenAiCompatibleClient,
    take_sse_line, SseLine,
};
pub use verirag_core::{Llm, LlmRequest, LlmResponse, Message, ResponseFormat, Role};
