//! Generic OpenAI-compatible LLM client
//!
//! Supports any provider using OpenAI's chat completions format (OpenAI, Azure-style
//! gateways, vLLM, Ollama's `/v1` endpoint, etc.)

use std::fmt;
use std::time::Duration;

use futures::stream::{BoxStream, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;
use verirag_core::{
    LlmRequest, LlmResponse, ResponseFormat, Role, Runnable, StreamEvent, VeriragError,
};

const CHAT_COMPLETIONS_PATH: &str = "v1/chat/completions";

/// Message as sent over the wire; conversation-only fields stay local.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

/// Request body for chat completions endpoint
#[derive(Serialize, Debug, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    pub stream: bool,
}

/// Non-streaming response from chat completions
#[derive(Deserialize, Debug, Clone)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResponseMessage {
    #[serde(default)]
    pub role: String,
    pub content: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Streaming chunk (server-sent events)
#[derive(Deserialize, Debug, Clone)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub id: String,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Delta {
    #[serde(default)]
    pub content: Option<String>,
}

/// OpenAI-style error response
#[derive(Deserialize, Debug, Clone)]
pub struct OpenAiError {
    pub error: ErrorDetail,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub code: Option<String>,
}

/// One decoded line of a chat completions event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    Content(String),
    Done,
    Skip,
}

pub fn parse_sse_line(line: &str) -> Result<SseLine, VeriragError> {
    let Some(data) = line.trim().strip_prefix("data:") else {
        return Ok(SseLine::Skip);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }
    if data.is_empty() {
        return Ok(SseLine::Skip);
    }
    let chunk: ChatCompletionChunk =
        serde_json::from_str(data).map_err(|err| VeriragError::ParseFailed {
            output: data.to_string(),
            reason: err.to_string(),
        })?;
    let content = chunk
        .choices
        .into_iter()
        .filter_map(|choice| choice.delta.content)
        .collect::<String>();
    if content.is_empty() {
        Ok(SseLine::Skip)
    } else {
        Ok(SseLine::Content(content))
    }
}

/// Splits the next complete line off `buffer`, leaving any partial tail in place.
/// Bytes are only decoded once the newline arrives, so a multi-byte character
/// split across network chunks is never mangled.
pub fn take_sse_line(buffer: &mut Vec<u8>) -> Option<Result<String, VeriragError>> {
    let newline = buffer.iter().position(|byte| *byte == b'\n')?;
    let line: Vec<u8> = buffer.drain(..=newline).collect();
    Some(
        String::from_utf8(line).map_err(|err| VeriragError::ParseFailed {
            output: String::from_utf8_lossy(err.as_bytes()).into_owned(),
            reason: err.utf8_error().to_string(),
        }),
    )
}

#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
    default_model: String,
    temperature: Option<f32>,
}

impl fmt::Debug for OpenAiCompatibleClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_some() {
            "<redacted>"
        } else {
            "<none>"
        };
        f.debug_struct("OpenAiCompatibleClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &api_key)
            .field("default_model", &self.default_model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Default)]
pub struct OpenAiCompatibleBuilder {
    base_url: Option<Url>,
    api_key: Option<String>,
    default_model: Option<String>,
    temperature: Option<f32>,
    timeout: Option<Duration>,
}

impl OpenAiCompatibleBuilder {
    pub fn base_url(mut self, value: &str) -> Result<Self, VeriragError> {
        let mut normalized = value.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let url = Url::parse(&normalized)
            .map_err(|err| VeriragError::InvalidConfig(format!("invalid base_url: {err}")))?;
        self.base_url = Some(url);
        Ok(self)
    }

    pub fn api_key(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.api_key = if value.trim().is_empty() {
            None
        } else {
            Some(value)
        };
        self
    }

    pub fn api_key_from_env(mut self, var_name: &str) -> Self {
        if let Ok(value) = std::env::var(var_name) {
            self = self.api_key(value);
        }
        self
    }

    pub fn default_model(mut self, value: impl Into<String>) -> Self {
        self.default_model = Some(value.into());
        self
    }

    pub fn temperature(mut self, value: f32) -> Self {
        self.temperature = Some(value);
        self
    }

    pub fn timeout(mut self, value: Duration) -> Self {
        self.timeout = Some(value);
        self
    }

    pub fn build(self) -> Result<OpenAiCompatibleClient, VeriragError> {
        let base_url = self
            .base_url
            .ok_or_else(|| VeriragError::InvalidConfig("base_url is required".to_string()))?;
        let default_model = self
            .default_model
            .filter(|model| !model.trim().is_empty())
            .ok_or_else(|| VeriragError::InvalidConfig("default_model is required".to_string()))?;

        let mut http = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }
        let http = http
            .build()
            .map_err(|err| VeriragError::LlmProvider(err.to_string()))?;

        Ok(OpenAiCompatibleClient {
            http,
            base_url,
            api_key: self.api_key.map(SecretString::new),
            default_model,
            temperature: self.temperature,
        })
    }
}

impl OpenAiCompatibleClient {
    pub fn builder() -> OpenAiCompatibleBuilder {
        OpenAiCompatibleBuilder::default()
    }

    pub fn set_default_model(&mut self, model: impl Into<String>) {
        self.default_model = model.into();
    }

    pub fn set_temperature(&mut self, temperature: Option<f32>) {
        self.temperature = temperature;
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    fn build_request(&self, input: LlmRequest, stream: bool) -> ChatCompletionRequest {
        let model = if input.model.is_empty() {
            self.default_model.clone()
        } else {
            input.model
        };
        ChatCompletionRequest {
            model,
            messages: input
                .messages
                .into_iter()
                .map(|message| WireMessage {
                    role: message.role,
                    content: message.content,
                })
                .collect(),
            temperature: input.temperature.or(self.temperature),
            max_tokens: None,
            response_format: input.response_format,
            stream,
        }
    }

    async fn send(&self, body: &ChatCompletionRequest) -> Result<reqwest::Response, VeriragError> {
        let url = self
            .base_url
            .join(CHAT_COMPLETIONS_PATH)
            .map_err(|err| VeriragError::InvalidConfig(err.to_string()))?;

        let mut request = self.http.post(url).json(body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        tracing::debug!(model = %body.model, stream = body.stream, "sending chat completion");
        let response = request
            .send()
            .await
            .map_err(|err| VeriragError::LlmProvider(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<OpenAiError>(&text)
            .map(|error| error.error.message)
            .unwrap_or(text);
        Err(VeriragError::LlmProvider(format!(
            "chat completion failed with status {status}: {message}"
        )))
    }
}

#[async_trait::async_trait]
impl Runnable<LlmRequest, LlmResponse> for OpenAiCompatibleClient {
    async fn invoke(&self, input: LlmRequest) -> Result<LlmResponse, VeriragError> {
        let body = self.build_request(input, false);
        let response: ChatCompletionResponse = self
            .send(&body)
            .await?
            .json()
            .await
            .map_err(|err| VeriragError::LlmProvider(err.to_string()))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| VeriragError::LlmProvider("no choices returned".to_string()))?;

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
        })
    }

    fn stream(&self, input: LlmRequest) -> BoxStream<'_, Result<StreamEvent, VeriragError>> {
        let body = self.build_request(input, true);
        async_stream::try_stream! {
            let response = self.send(&body).await?;
            let mut bytes = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();
            let mut answer = String::new();

            'outer: while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|err| VeriragError::LlmProvider(err.to_string()))?;
                buffer.extend_from_slice(&chunk);

                while let Some(line) = take_sse_line(&mut buffer) {
                    match parse_sse_line(&line?)? {
                        SseLine::Content(delta) => {
                            answer.push_str(&delta);
                            yield StreamEvent::ContentChunk(delta);
                        }
                        SseLine::Done => break 'outer,
                        SseLine::Skip => {}
                    }
                }
            }

            yield StreamEvent::FinalAnswer(answer);
        }
        .boxed()
    }
}
