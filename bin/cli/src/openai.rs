//! OpenAI-compatible chat completions backend.
//!
//! Streams replies over server-sent events and maps each
//! `chat.completion.chunk` delta onto [`StreamChunk`]s. Works with any
//! endpoint that speaks the same protocol, local servers included.

use crate::config::ModelConfig;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::future;
use futures::stream::{self, StreamExt};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use sqlscout_ai::{ChatRequest, ChunkStream, LlmBackend, LlmError, StreamChunk, ToolChoice};
use sqlscout_conversation::{Message, MessageRole};
use tracing::{debug, instrument, warn};

const PROVIDER: &str = "openai";
const DONE_MARKER: &str = "[DONE]";
const CHUNK_OBJECT: &str = "chat.completion.chunk";

/// Backend for `/chat/completions` endpoints.
pub struct OpenAiBackend {
    client: reqwest::Client,
    config: ModelConfig,
}

impl OpenAiBackend {
    /// Creates a backend for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::InvalidConfig` if the HTTP client cannot be built.
    pub fn new(config: ModelConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: e.to_string(),
            })?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn request_body(&self, request: &ChatRequest) -> JsonValue {
        let mut body = json!({
            "model": self.config.model,
            "stream": true,
            "temperature": self.config.temperature,
            "messages": request.messages.iter().map(wire_message).collect::<Vec<_>>(),
        });
        if !request.tools.is_empty() {
            body["tools"] = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.input_schema,
                        }
                    })
                })
                .collect();
            body["tool_choice"] = match request.tool_choice {
                ToolChoice::Auto => json!("auto"),
                ToolChoice::Forced => json!("required"),
            };
        }
        body
    }
}

fn wire_message(message: &Message) -> JsonValue {
    match message.role {
        MessageRole::System => json!({ "role": "system", "content": message.content }),
        MessageRole::User => json!({ "role": "user", "content": message.content }),
        MessageRole::Assistant => {
            let mut wire = json!({ "role": "assistant", "content": message.content });
            if message.has_tool_calls() {
                wire["tool_calls"] = message
                    .tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
            }
            wire
        }
        MessageRole::Tool => json!({
            "role": "tool",
            "tool_call_id": message
                .tool_result
                .as_ref()
                .map(|result| result.tool_call_id.as_str())
                .unwrap_or_default(),
            "content": message.text(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallDelta>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    index: usize,
    id: Option<String>,
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

fn api_error_message(event: &JsonValue) -> Option<String> {
    let error = event.get("error")?;
    if let Some(message) = error.get("message").and_then(JsonValue::as_str) {
        return Some(message.to_string());
    }
    if let Some(message) = error.as_str() {
        return Some(message.to_string());
    }
    Some("provider reported an error while streaming".to_string())
}

/// Decodes the data of one event into chunks.
///
/// Events that are not completion chunks decode to nothing.
fn decode_event(data: &str) -> Result<Vec<StreamChunk>, LlmError> {
    let event: JsonValue =
        serde_json::from_str(data).map_err(|e| LlmError::ResponseParseFailed {
            reason: format!("{e}, data: {data}"),
        })?;
    if let Some(message) = api_error_message(&event) {
        return Err(LlmError::RequestFailed { reason: message });
    }
    if event.get("object").and_then(JsonValue::as_str) != Some(CHUNK_OBJECT) {
        warn!(data, "skipping non-standard event");
        return Ok(Vec::new());
    }
    let chunk: CompletionChunk =
        serde_json::from_value(event).map_err(|e| LlmError::ResponseParseFailed {
            reason: format!("{e}, data: {data}"),
        })?;

    let mut chunks = Vec::new();
    for choice in chunk.choices {
        if let Some(text) = choice.delta.content
            && !text.is_empty()
        {
            chunks.push(StreamChunk::text(text));
        }
        for call in choice.delta.tool_calls {
            let (name, arguments) = match call.function {
                Some(function) => (function.name, function.arguments),
                None => (None, None),
            };
            if call.id.is_some() || name.is_some() {
                chunks.push(StreamChunk::tool_call_start(
                    call.index,
                    call.id.unwrap_or_default(),
                    name.unwrap_or_default(),
                ));
            }
            if let Some(arguments) = arguments
                && !arguments.is_empty()
            {
                chunks.push(StreamChunk::tool_call_delta(call.index, arguments));
            }
        }
    }
    Ok(chunks)
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    #[instrument(skip(self, request), fields(model = %self.config.model, messages = request.messages.len()))]
    async fn stream(&self, request: &ChatRequest) -> Result<ChunkStream, LlmError> {
        let mut builder = self
            .client
            .post(self.endpoint())
            .json(&self.request_body(request));
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::ProviderUnavailable {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse().ok());
            return Err(LlmError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed {
                reason: format!("{status}: {body}"),
            });
        }
        debug!(%status, "streaming reply");

        let chunks = response
            .bytes_stream()
            .eventsource()
            .take_while(|event| future::ready(!matches!(event, Ok(e) if e.data == DONE_MARKER)))
            .map(|event| match event {
                Ok(event) => decode_event(&event.data),
                Err(e) => Err(LlmError::StreamInterrupted {
                    reason: e.to_string(),
                }),
            })
            .flat_map(|decoded| {
                let items: Vec<Result<StreamChunk, LlmError>> = match decoded {
                    Ok(chunks) => chunks.into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(e)],
                };
                stream::iter(items)
            });
        Ok(chunks.boxed())
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
