use std::sync::Arc;

use verirag_core::{Llm, SearchTool};
use verirag_graph::{GraphBuilder, END};

use crate::grade::{Answerability, Grounding};
use crate::nodes::{
    AnswerabilityGrader, FallbackNode, GenerateNode, HallucinationGrader, RetrieveNode,
};
use crate::state::ConversationState;
use crate::ModelSettings;

pub const RETRIEVE: &str = "retrieve";
pub const GRADE_DOCUMENTS: &str = "grade_documents";
pub const GENERATE: &str = "generate";
pub const GRADE_GENERATION: &str = "grade_generation";
pub const FALLBACK: &str = "fallback";

/// Nodes whose assistant message is the answer shown to the caller.
pub const TERMINAL_NODES: [&str; 2] = [GENERATE, FALLBACK];

/// Wires the graded retrieval topology:
///
/// ```text
/// retrieve -> grade_documents -answerable-> generate -> grade_generation -useful-> END
///                            \-not answerable-> fallback <-not supported-/
/// fallback -> END
/// ```
pub fn rag_graph(
    llm: Arc<dyn Llm>,
    search: Arc<dyn SearchTool>,
    settings: ModelSettings,
) -> GraphBuilder<ConversationState> {
    GraphBuilder::new()
        .add_node(RETRIEVE, RetrieveNode::new(search))
        .add_conditional_node(
            GRADE_DOCUMENTS,
            AnswerabilityGrader::new(llm.clone(), settings.clone()),
            |route| match route {
                Answerability::Answerable => GENERATE,
                Answerability::NotAnswerable => FALLBACK,
            },
        )
        .add_node(GENERATE, GenerateNode::new(llm.clone(), settings.clone()))
        .add_conditional_node(
            GRADE_GENERATION,
            HallucinationGrader::new(llm.clone(), settings.clone()),
            |route| match route {
                Grounding::Useful => END,
                Grounding::NotSupported => FALLBACK,
            },
        )
        .add_node(FALLBACK, FallbackNode::new(llm, settings))
        .add_edge(RETRIEVE, GRADE_DOCUMENTS)
        .add_edge(GENERATE, GRADE_GENERATION)
        .add_edge(FALLBACK, END)
        .set_entry(RETRIEVE)
}
