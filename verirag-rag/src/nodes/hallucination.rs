use std::sync::Arc;

use verirag_core::{Llm, Role, VeriragError};
use verirag_graph::{GraphState, Router};
use verirag_prompt::PromptTemplate;

use crate::grade::{request_grade, Grounding};
use crate::prompts::HALLUCINATION_PROMPT;
use crate::state::ConversationState;
use crate::ModelSettings;

/// Checks that the generated answer is supported by the turn's documents.
pub struct HallucinationGrader {
    llm: Arc<dyn Llm>,
    settings: ModelSettings,
    prompt: PromptTemplate,
}

impl HallucinationGrader {
    pub fn new(llm: Arc<dyn Llm>, settings: ModelSettings) -> Self {
        Self {
            llm,
            settings,
            prompt: PromptTemplate::new(HALLUCINATION_PROMPT),
        }
    }
}

#[async_trait::async_trait]
impl Router<ConversationState> for HallucinationGrader {
    type Route = Grounding;

    async fn route(&self, state: &GraphState<ConversationState>) -> Result<Grounding, VeriragError> {
        let generation = state
            .data
            .last_message()
            .filter(|message| message.role == Role::Assistant)
            .map(|message| message.content.as_str())
            .unwrap_or("");
        if generation.trim().is_empty() {
            tracing::warn!("no generation to grade");
            return Ok(Grounding::NotSupported);
        }

        let documents = state
            .data
            .turn_documents()
            .map(|message| message.content.as_str())
            .unwrap_or("");
        let prompt = self
            .prompt
            .render_pairs(&[("documents", documents), ("generation", generation)])?;
        let grade = request_grade(self.llm.as_ref(), &self.settings, prompt).await?;

        Ok(if grade.is_yes() {
            Grounding::Useful
        } else {
            Grounding::NotSupported
        })
    }
}
