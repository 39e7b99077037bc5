use verirag_core::{LlmRequest, Message, ResponseFormat};

/// Model parameters shared by every node that calls the language model.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelSettings {
    /// Empty lets the client use its configured default model.
    pub model: String,
    pub temperature: f32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.0,
        }
    }
}

impl ModelSettings {
    pub fn free_text(&self, messages: Vec<Message>) -> LlmRequest {
        LlmRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(self.temperature),
            response_format: None,
        }
    }

    pub fn structured(&self, messages: Vec<Message>) -> LlmRequest {
        self.free_text(messages)
            .with_response_format(ResponseFormat::JsonObject)
    }
}
