use std::sync::Arc;

use futures::stream::BoxStream;
use verirag_core::{
    Llm, LlmRequest, Message, Runnable, StrOutputParser, StreamEvent, VeriragError,
};
use verirag_graph::{GraphState, StateUpdate};
use verirag_prompt::PromptTemplate;

use super::stream_completion;
use crate::prompts::FALLBACK_PROMPT;
use crate::state::{append, format_chat_history, ConversationState};
use crate::ModelSettings;

/// Answers without retrieved context under the conservative prompt. History
/// stops before the active question, so this turn's documents and any
/// rejected generation are left out.
pub struct FallbackNode {
    llm: Arc<dyn Llm>,
    settings: ModelSettings,
    prompt: PromptTemplate,
}

impl FallbackNode {
    pub fn new(llm: Arc<dyn Llm>, settings: ModelSettings) -> Self {
        Self {
            llm,
            settings,
            prompt: PromptTemplate::new(FALLBACK_PROMPT),
        }
    }

    fn request(&self, state: &ConversationState) -> Result<LlmRequest, VeriragError> {
        let chat_history = format_chat_history(state.history_before_question());
        let prompt = self.prompt.render_pairs(&[
            ("question", state.question_text()),
            ("chat_history", chat_history.as_str()),
        ])?;
        Ok(self.settings.free_text(vec![Message::user(prompt)]))
    }
}

#[async_trait::async_trait]
impl Runnable<GraphState<ConversationState>, StateUpdate<ConversationState>> for FallbackNode {
    async fn invoke(
        &self,
        input: GraphState<ConversationState>,
    ) -> Result<StateUpdate<ConversationState>, VeriragError> {
        let request = self.request(&input.data)?;
        let response = self.llm.invoke(request).await?;
        let answer = StrOutputParser.invoke(response).await?;
        Ok(append(vec![Message::assistant(answer)]))
    }

    fn stream(
        &self,
        input: GraphState<ConversationState>,
    ) -> BoxStream<'_, Result<StreamEvent, VeriragError>> {
        stream_completion(self.llm.as_ref(), self.request(&input.data))
    }
}
