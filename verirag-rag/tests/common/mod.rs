#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use futures::stream::{BoxStream, StreamExt};
use verirag_core::{
    LlmRequest, LlmResponse, ResponseFormat, Runnable, SearchTool, StreamEvent, VeriragError,
};
use verirag_rag::prompts::{ANSWERABILITY_PROMPT, FALLBACK_PROMPT, HALLUCINATION_PROMPT};

/// Which prompt a request was rendered from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Call {
    Answerability,
    Generate,
    Hallucination,
    Fallback,
}

fn marker(template: &str) -> &str {
    template.lines().next().unwrap_or(template)
}

fn classify(request: &LlmRequest) -> Call {
    let prompt = request
        .messages
        .last()
        .map(|m| m.content.as_str())
        .unwrap_or("");
    if prompt.starts_with(marker(ANSWERABILITY_PROMPT)) {
        Call::Answerability
    } else if prompt.starts_with(marker(HALLUCINATION_PROMPT)) {
        Call::Hallucination
    } else if prompt.starts_with(&FALLBACK_PROMPT[..60]) {
        Call::Fallback
    } else {
        Call::Generate
    }
}

/// Language model double answering each prompt kind with a fixed reply.
#[derive(Clone)]
pub struct ScriptedLlm {
    pub answerable: &'static str,
    pub grounded: &'static str,
    pub answer: String,
    pub fallback: String,
    pub fail_on: Option<Call>,
    calls: Arc<Mutex<Vec<(Call, LlmRequest)>>>,
}

impl ScriptedLlm {
    pub fn new(answerable: &'static str, grounded: &'static str) -> Self {
        Self {
            answerable,
            grounded,
            answer: "Paris is the capital of France.".to_string(),
            fallback: "The context provided is insufficient to answer this definitively; \
                       please share more documents."
                .to_string(),
            fail_on: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn answering(mut self, answer: &str) -> Self {
        self.answer = answer.to_string();
        self
    }

    pub fn failing_on(mut self, call: Call) -> Self {
        self.fail_on = Some(call);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().iter().map(|(c, _)| *c).collect()
    }

    pub fn prompt_for(&self, call: Call) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(c, _)| *c == call)
            .and_then(|(_, request)| request.messages.last().map(|m| m.content.clone()))
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl Runnable<LlmRequest, LlmResponse> for ScriptedLlm {
    async fn invoke(&self, input: LlmRequest) -> Result<LlmResponse, VeriragError> {
        let call = classify(&input);
        let structured = input.response_format == Some(ResponseFormat::JsonObject);
        self.calls.lock().unwrap().push((call, input));

        if self.fail_on == Some(call) {
            return Err(VeriragError::LlmProvider("model unavailable".to_string()));
        }

        let content = match call {
            Call::Answerability => format!(r#"{{"grade": "{}"}}"#, self.answerable),
            Call::Hallucination => format!(r#"{{"grade": "{}"}}"#, self.grounded),
            Call::Generate => self.answer.clone(),
            Call::Fallback => self.fallback.clone(),
        };
        assert_eq!(
            structured,
            matches!(call, Call::Answerability | Call::Hallucination),
            "only grading requests ask for JSON"
        );
        Ok(LlmResponse { content })
    }

    fn stream(&self, _input: LlmRequest) -> BoxStream<'_, Result<StreamEvent, VeriragError>> {
        futures::stream::empty().boxed()
    }
}

/// Search double returning a fixed blob and recording queries.
#[derive(Clone)]
pub struct ScriptedSearch {
    content: Result<String, String>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSearch {
    pub fn returning(content: &str) -> Self {
        Self {
            content: Ok(content.to_string()),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            content: Err(reason.to_string()),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SearchTool for ScriptedSearch {
    fn name(&self) -> &str {
        "retrieve_documents"
    }

    async fn search(&self, query: &str) -> Result<String, VeriragError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.content
            .clone()
            .map_err(VeriragError::Custom)
    }
}

pub const FRANCE_DOCS: &str = "Paris is the capital of France. It lies on the Seine.";
pub const UNRELATED_DOCS: &str = "The build system caches compiled artifacts per profile.";
