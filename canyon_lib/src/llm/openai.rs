use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{ChatModel, ModelError, ModelReply};
use crate::{
    config::{API_KEY_ENV, ModelConfig},
    conversation::{ToolCall, Turn},
    preview,
    tools::ToolDefinition,
};

/// Chat-completions client for OpenAI-compatible hosts (OpenRouter by default).
pub struct OpenAiCompatModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiCompatModel {
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(ModelError::MissingApiKey(API_KEY_ENV))?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| ModelError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

impl ChatModel for OpenAiCompatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        turns: &[Turn],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, ModelError> {
        let body = request_body(&self.model, self.temperature, turns, tools);
        debug!(
            endpoint = %self.endpoint,
            message_count = turns.len(),
            tool_count = tools.len(),
            "openai_chat_request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| ModelError::Http {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| ModelError::Http {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        if !status.is_success() {
            return Err(ModelError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        parse_response(&text)
    }
}

fn request_body(model: &str, temperature: f32, turns: &[Turn], tools: &[ToolDefinition]) -> Value {
    let mut body = json!({
        "model": model,
        "messages": turns.iter().map(wire_message).collect::<Vec<_>>(),
        "temperature": temperature,
    });

    if !tools.is_empty() {
        body["tools"] = Value::Array(tools.iter().map(ToolDefinition::to_wire).collect());
        body["tool_choice"] = json!("auto");
    }

    body
}

fn wire_message(turn: &Turn) -> Value {
    match turn {
        Turn::System(content) => json!({ "role": "system", "content": content }),
        Turn::User(content) => json!({ "role": "user", "content": content }),
        Turn::Assistant {
            content,
            tool_calls,
        } if !tool_calls.is_empty() => {
            let calls: Vec<Value> = tool_calls
                .iter()
                .map(|call| {
                    let arguments = match &call.arguments {
                        Value::String(raw) => raw.clone(),
                        other => other.to_string(),
                    };
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": { "name": call.name, "arguments": arguments },
                    })
                })
                .collect();
            let content = if content.is_empty() {
                Value::Null
            } else {
                json!(content)
            };
            json!({ "role": "assistant", "content": content, "tool_calls": calls })
        }
        Turn::Assistant { content, .. } => json!({ "role": "assistant", "content": content }),
        Turn::Tool {
            call_id, content, ..
        } => json!({ "role": "tool", "tool_call_id": call_id, "content": content }),
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: WireError,
}

fn parse_response(text: &str) -> Result<ModelReply, ModelError> {
    if text.trim().is_empty() {
        return Err(ModelError::EmptyReply);
    }

    let response: CompletionResponse =
        serde_json::from_str(text).map_err(|e| ModelError::Decode(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(ModelError::Provider(error.message));
    }

    let message = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or(ModelError::EmptyReply)?;

    let calls: Vec<ToolCall> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, call)| ToolCall {
            id: call.id.unwrap_or_else(|| format!("call_{index}")),
            name: call.function.name,
            arguments: decode_arguments(call.function.arguments),
        })
        .collect();

    let content = message.content.unwrap_or_default();
    if calls.is_empty() && content.trim().is_empty() {
        return Err(ModelError::EmptyReply);
    }

    Ok(ModelReply::from_parts(content, calls))
}

/// Arguments arrive as a JSON-encoded string; undecodable text is passed
/// through so the tool can report it back to the model.
fn decode_arguments(raw: Option<Value>) -> Value {
    match raw {
        None => json!({}),
        Some(Value::String(text)) if text.trim().is_empty() => json!({}),
        Some(Value::String(text)) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        Some(other) => other,
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| preview(body.trim(), 300))
}
