use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};
use verirag_core::{Message, Runnable, SearchTool, StreamEvent, VeriragError};
use verirag_graph::{GraphState, StateUpdate};

use crate::state::{append, ConversationState};

/// Searches with the active question and appends the result as one tool message.
pub struct RetrieveNode {
    tool: Arc<dyn SearchTool>,
}

impl RetrieveNode {
    pub fn new(tool: Arc<dyn SearchTool>) -> Self {
        Self { tool }
    }

    async fn search(&self, query: &str) -> Result<String, VeriragError> {
        self.tool.search(query).await.map_err(|err| match err {
            VeriragError::ToolCallFailed { .. } => err,
            other => VeriragError::ToolCallFailed {
                tool_name: self.tool.name().to_string(),
                reason: other.to_string(),
            },
        })
    }
}

#[async_trait::async_trait]
impl Runnable<GraphState<ConversationState>, StateUpdate<ConversationState>> for RetrieveNode {
    async fn invoke(
        &self,
        input: GraphState<ConversationState>,
    ) -> Result<StateUpdate<ConversationState>, VeriragError> {
        let query = input.data.question_text();
        if query.is_empty() {
            tracing::warn!("no question in conversation; searching with an empty query");
        }

        let content = self.search(query).await?;
        tracing::debug!(tool = self.tool.name(), bytes = content.len(), "retrieved");
        Ok(append(vec![Message::tool(self.tool.name(), content)]))
    }

    fn stream(
        &self,
        input: GraphState<ConversationState>,
    ) -> BoxStream<'_, Result<StreamEvent, VeriragError>> {
        futures::stream::once(async move {
            let query = input.data.question_text().to_string();
            self.search(&query).await.map(StreamEvent::FinalAnswer)
        })
        .boxed()
    }
}
