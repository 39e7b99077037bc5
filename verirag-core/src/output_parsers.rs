use std::marker::PhantomData;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{LlmResponse, Runnable, StreamEvent, Value, VeriragError};

/// Extracts the text content of a model response.
#[derive(Clone, Copy, Default)]
pub struct StrOutputParser;

#[async_trait]
impl Runnable<LlmResponse, String> for StrOutputParser {
    async fn invoke(&self, input: LlmResponse) -> Result<String, VeriragError> {
        Ok(input.content)
    }

    fn stream(&self, input: LlmResponse) -> BoxStream<'_, Result<StreamEvent, VeriragError>> {
        futures::stream::once(async move { Ok(StreamEvent::ContentChunk(input.content)) }).boxed()
    }
}

/// Parses a JSON object out of a model response into `T`, tolerating a
/// surrounding markdown code fence.
#[derive(Clone, Default)]
pub struct StructuredOutputParser<T = Value> {
    _marker: PhantomData<T>,
}

impl<T> StructuredOutputParser<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        rest.trim_end_matches("```").trim()
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest.trim_end_matches("```").trim()
    } else {
        trimmed
    }
}

#[async_trait]
impl<T> Runnable<LlmResponse, T> for StructuredOutputParser<T>
where
    T: DeserializeOwned + Serialize + Send + Sync + 'static,
{
    async fn invoke(&self, input: LlmResponse) -> Result<T, VeriragError> {
        let cleaned = strip_code_fence(&input.content);
        if cleaned.is_empty() {
            return Err(VeriragError::ParseFailed {
                output: input.content,
                reason: "empty structured output".to_string(),
            });
        }

        serde_json::from_str(cleaned).map_err(|err| VeriragError::ParseFailed {
            output: input.content.clone(),
            reason: err.to_string(),
        })
    }

    fn stream(&self, input: LlmResponse) -> BoxStream<'_, Result<StreamEvent, VeriragError>> {
        futures::stream::once(async move {
            let parsed = self.invoke(input).await?;
            Ok(StreamEvent::Metadata {
                key: "structured".to_string(),
                value: serde_json::to_value(parsed)?,
            })
        })
        .boxed()
    }
}
