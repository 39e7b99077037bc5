//! Prompt texts, rendered with `{{name}}` placeholders.

pub const QA_PROMPT: &str = "You are an assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, explain that you need more context. \
Use three sentences maximum and keep the answer concise.
Chat History: {{chat_history}}
Question: {{question}}
Context: {{context}}
Answer:";

pub const FALLBACK_PROMPT: &str = "You are an assistant for question-answering tasks. \
Your task is to respond appropriately based on the nature of the question.

If the question involves a business topic, is of significant importance, or you believe more context is needed to provide an accurate answer:
1. Indicate that the context provided is insufficient to answer the question definitively.
2. Mention that more specific information or additional documents are needed to answer the question accurately.
3. Clearly state that you are providing a response based on general knowledge, and your answer may not be fully tailored to the provided documents.
4. Encourage the user to provide more documents or clarify the question for a more accurate response.

For questions that don't require additional context:
1. Respond directly with the information you know, based on the context or general knowledge.

Keep your response concise and no longer than three sentences. Be mindful to provide a tailored answer only when relevant, and when in doubt, ask for clarification or more details.

Chat History: {{chat_history}}
Question: {{question}}";

pub const ANSWERABILITY_PROMPT: &str = "You are tasked with determining if the documents explicitly provide the information needed to answer the following question.

Documents: {{documents}}
Question: {{question}}

Carefully analyze the documents and check if any part of the documents explicitly contains the answer to the question. \
If the documents explicitly provide the answer to the question, respond with \"yes\". \
If the documents do not contain the exact answer to the question, respond with \"no\".

Do not infer, assume, or provide any answers based on indirect information. \
Only respond with \"yes\" or \"no\", and make sure your answer is based on the exact content of the documents.";

pub const HALLUCINATION_PROMPT: &str = "You are a grader assessing whether an LLM generation is grounded in / supported by a set of retrieved facts.
Give a binary score 'yes' or 'no'. 'Yes' means that the answer is grounded in / supported by the set of facts.

Set of facts: {{documents}}

LLM generation: {{generation}}";

/// Sent as the system message of every grading request.
pub const GRADE_FORMAT_INSTRUCTION: &str =
    "Reply with a JSON object with a single key \"grade\" whose value is \"yes\" or \"no\".";

#[cfg(test)]
mod tests {
    use super::*;
    use verirag_prompt::PromptTemplate;

    #[test]
    fn prompts_declare_expected_variables() {
        let vars = |text: &str| PromptTemplate::new(text).input_variables().unwrap();
        assert_eq!(vars(QA_PROMPT), vec!["chat_history", "question", "context"]);
        assert_eq!(vars(FALLBACK_PROMPT), vec!["chat_history", "question"]);
        assert_eq!(vars(ANSWERABILITY_PROMPT), vec!["documents", "question"]);
        assert_eq!(vars(HALLUCINATION_PROMPT), vec!["documents", "generation"]);
    }
}
