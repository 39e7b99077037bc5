use std::sync::Arc;

use verirag_core::{Llm, VeriragError};
use verirag_graph::{GraphState, Router};
use verirag_prompt::PromptTemplate;

use crate::grade::{request_grade, Answerability};
use crate::prompts::ANSWERABILITY_PROMPT;
use crate::state::ConversationState;
use crate::ModelSettings;

/// Decides whether this turn's retrieved documents can answer the active
/// question. Never writes state.
pub struct AnswerabilityGrader {
    llm: Arc<dyn Llm>,
    settings: ModelSettings,
    prompt: PromptTemplate,
}

impl AnswerabilityGrader {
    pub fn new(llm: Arc<dyn Llm>, settings: ModelSettings) -> Self {
        Self {
            llm,
            settings,
            prompt: PromptTemplate::new(ANSWERABILITY_PROMPT),
        }
    }
}

#[async_trait::async_trait]
impl Router<ConversationState> for AnswerabilityGrader {
    type Route = Answerability;

    async fn route(
        &self,
        state: &GraphState<ConversationState>,
    ) -> Result<Answerability, VeriragError> {
        let question = state.data.question_text();
        let documents = state
            .data
            .turn_documents()
            .map(|message| message.content.as_str())
            .unwrap_or("");

        if question.trim().is_empty() || documents.trim().is_empty() {
            tracing::warn!(
                has_question = !question.trim().is_empty(),
                has_documents = !documents.trim().is_empty(),
                "missing documents or question"
            );
            return Ok(Answerability::NotAnswerable);
        }

        let prompt = self
            .prompt
            .render_pairs(&[("documents", documents), ("question", question)])?;
        let grade = request_grade(self.llm.as_ref(), &self.settings, prompt).await?;

        Ok(if grade.is_yes() {
            Answerability::Answerable
        } else {
            Answerability::NotAnswerable
        })
    }
}
