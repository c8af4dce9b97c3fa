use ollama_rs::{
    Ollama,
    generation::{
        chat::{ChatMessage, request::ChatMessageRequest},
        tools::ToolInfo,
    },
    models::ModelOptions,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use super::{ChatModel, ModelError, ModelReply, parse};
use crate::{
    config::ModelConfig,
    conversation::{ToolCall, Turn},
    tools::ToolDefinition,
};

const DEFAULT_OLLAMA_PORT: u16 = 11434;

pub struct OllamaModel {
    client: Ollama,
    model: String,
    temperature: f32,
}

impl OllamaModel {
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        let (host, port) = split_host(&config.base_url)?;
        reqwest::Url::parse(&host)
            .map_err(|e| ModelError::Provider(format!("invalid ollama host '{host}': {e}")))?;
        debug!(host = %host, port, model = %config.model, "ollama_client");
        Ok(Self {
            client: Ollama::builder().host(host).port(port).build(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

impl ChatModel for OllamaModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        turns: &[Turn],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, ModelError> {
        let messages = turns
            .iter()
            .map(|turn| from_json::<ChatMessage>(wire_message(turn)))
            .collect::<Result<Vec<_>, _>>()?;
        let tool_infos = tools
            .iter()
            .map(|tool| from_json::<ToolInfo>(tool.to_wire()))
            .collect::<Result<Vec<_>, _>>()?;

        let request = ChatMessageRequest::new(self.model.clone(), messages)
            .tools(tool_infos)
            .options(ModelOptions::default().temperature(self.temperature));

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|err| ModelError::Ollama(format!("{} ({})", err, self.model)))?;

        let message =
            serde_json::to_value(&response.message).map_err(|e| ModelError::Decode(e.to_string()))?;
        let tool_names: Vec<&str> = tools.iter().map(|tool| tool.name.as_str()).collect();
        reply_from_message(&message, &tool_names)
    }
}

fn from_json<T: DeserializeOwned>(value: Value) -> Result<T, ModelError> {
    serde_json::from_value(value).map_err(|e| ModelError::Decode(e.to_string()))
}

fn wire_message(turn: &Turn) -> Value {
    match turn {
        Turn::System(content) => json!({ "role": "system", "content": content, "tool_calls": [] }),
        Turn::User(content) => json!({ "role": "user", "content": content, "tool_calls": [] }),
        Turn::Assistant {
            content,
            tool_calls,
        } => {
            let calls: Vec<Value> = tool_calls
                .iter()
                .map(|call| {
                    let arguments = match &call.arguments {
                        Value::String(raw) => {
                            serde_json::from_str(raw).unwrap_or_else(|_| json!({}))
                        }
                        other => other.clone(),
                    };
                    json!({ "function": { "name": call.name, "arguments": arguments } })
                })
                .collect();
            json!({ "role": "assistant", "content": content, "tool_calls": calls })
        }
        Turn::Tool { content, .. } => json!({ "role": "tool", "content": content, "tool_calls": [] }),
    }
}

/// Native tool calls win; otherwise the content is scanned for a JSON tool call,
/// which smaller local models tend to emit as plain text.
fn reply_from_message(message: &Value, tool_names: &[&str]) -> Result<ModelReply, ModelError> {
    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut calls: Vec<ToolCall> = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let function = item.get("function")?;
                    let name = function.get("name")?.as_str()?.to_string();
                    let arguments = function.get("arguments").cloned().unwrap_or(json!({}));
                    Some((name, arguments))
                })
                .enumerate()
                .map(|(index, (name, arguments))| ToolCall {
                    id: format!("call_{index}"),
                    name,
                    arguments,
                })
                .collect()
        })
        .unwrap_or_default();

    if calls.is_empty() {
        calls = parse::parse_tool_calls_from_text(&content, tool_names);
        if !calls.is_empty() {
            debug!(call_count = calls.len(), "ollama_text_tool_calls");
            return Ok(ModelReply::ToolCalls {
                content: String::new(),
                calls,
            });
        }
    }

    if calls.is_empty() && content.trim().is_empty() {
        return Err(ModelError::EmptyReply);
    }

    Ok(ModelReply::from_parts(content, calls))
}

fn split_host(base_url: &str) -> Result<(String, u16), ModelError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ModelError::Provider("ollama host is empty".to_string()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let authority_start = with_scheme.find("://").map_or(0, |i| i + 3);
    match with_scheme[authority_start..].rfind(':') {
        Some(offset) => {
            let split = authority_start + offset;
            let port = with_scheme[split + 1..].parse::<u16>().map_err(|e| {
                ModelError::Provider(format!("invalid ollama port in '{base_url}': {e}"))
            })?;
            Ok((with_scheme[..split].to_string(), port))
        }
        None => Ok((with_scheme, DEFAULT_OLLAMA_PORT)),
    }
}

#[cfg(test)]
mod tests {
    use ollama_rs::generation::chat::MessageRole;

    use super::*;

    #[test]
    fn host_and_port_are_split() {
        assert_eq!(
            split_host("http://localhost:11434").unwrap(),
            ("http://localhost".to_string(), 11434)
        );
        assert_eq!(
            split_host("gpu-box:8080/").unwrap(),
            ("http://gpu-box".to_string(), 8080)
        );
        assert_eq!(
            split_host("https://ollama.internal").unwrap(),
            ("https://ollama.internal".to_string(), DEFAULT_OLLAMA_PORT)
        );
        assert!(split_host("http://host:port").is_err());
        assert!(split_host(" ").is_err());
    }

    #[test]
    fn assistant_arguments_are_sent_as_objects() {
        let turn = Turn::Assistant {
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: "call_0".into(),
                name: "query_feeds".into(),
                arguments: json!("{\"sql\":\"SELECT 1\"}"),
            }],
        };
        let wire = wire_message(&turn);
        assert_eq!(wire["tool_calls"][0]["function"]["arguments"]["sql"], "SELECT 1");
    }

    #[test]
    fn tool_definitions_decode_into_ollama_types() {
        let definitions = crate::tools::definitions();
        assert_eq!(definitions.len(), 3);

        for definition in &definitions {
            let info: ToolInfo = from_json(definition.to_wire()).unwrap();
            assert_eq!(info.function.name, definition.name);
            assert_eq!(info.function.description, definition.description);
        }
    }

    #[test]
    fn every_turn_decodes_into_a_chat_message() {
        let turns = [
            (Turn::System("rules".into()), MessageRole::System),
            (Turn::User("how many feeds?".into()), MessageRole::User),
            (
                Turn::Assistant {
                    content: String::new(),
                    tool_calls: vec![ToolCall {
                        id: "call_0".into(),
                        name: "query_feeds".into(),
                        arguments: json!({ "sql": "SELECT COUNT(*) FROM camera_feeds" }),
                    }],
                },
                MessageRole::Assistant,
            ),
            (
                Turn::Tool {
                    call_id: "call_0".into(),
                    name: "query_feeds".into(),
                    content: "100".into(),
                    is_error: false,
                },
                MessageRole::Tool,
            ),
        ];

        for (turn, role) in turns {
            let message: ChatMessage = from_json(wire_message(&turn)).unwrap();
            assert_eq!(message.role, role);
            assert_eq!(message.content, turn.content());
        }

        let assistant = assistant_with_call();
        let message: ChatMessage = from_json(wire_message(&assistant)).unwrap();
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].function.name, "query_feeds");
        assert_eq!(message.tool_calls[0].function.arguments["sql"], "SELECT 1");
    }

    fn assistant_with_call() -> Turn {
        Turn::Assistant {
            content: "checking".into(),
            tool_calls: vec![ToolCall {
                id: "call_0".into(),
                name: "query_feeds".into(),
                arguments: json!({ "sql": "SELECT 1" }),
            }],
        }
    }

    #[test]
    fn client_accepts_valid_hosts_only() {
        let config = ModelConfig::for_provider(crate::config::ProviderKind::Ollama);
        assert!(OllamaModel::new(&config).is_ok());

        let bad = ModelConfig {
            base_url: "http://gpu box".into(),
            ..ModelConfig::for_provider(crate::config::ProviderKind::Ollama)
        };
        assert!(matches!(OllamaModel::new(&bad), Err(ModelError::Provider(_))));
    }

    #[test]
    fn native_tool_calls_are_read() {
        let message = json!({
            "role": "assistant",
            "content": "",
            "tool_calls": [
                { "function": { "name": "query_feeds", "arguments": { "sql": "SELECT 1" } } }
            ]
        });
        let reply = reply_from_message(&message, &["query_feeds"]).unwrap();
        let ModelReply::ToolCalls { calls, .. } = reply else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].name, "query_feeds");
        assert_eq!(calls[0].id, "call_0");
    }

    #[test]
    fn text_tool_calls_fall_back() {
        let message = json!({
            "role": "assistant",
            "content": "{\"name\": \"get_schema\", \"arguments\": {\"schema_type\": \"encoder\"}}"
        });
        let reply = reply_from_message(&message, &["get_schema"]).unwrap();
        let ModelReply::ToolCalls { calls, .. } = reply else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].arguments["schema_type"], "encoder");
    }

    #[test]
    fn plain_text_is_final() {
        let message = json!({ "role": "assistant", "content": "The encoder preset is medium." });
        assert_eq!(
            reply_from_message(&message, &["get_schema"]).unwrap(),
            ModelReply::Final("The encoder preset is medium.".into())
        );
        assert!(matches!(
            reply_from_message(&json!({ "content": "" }), &[]),
            Err(ModelError::EmptyReply)
        ));
    }
}
