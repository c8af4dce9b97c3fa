mod ollama;
mod openai;
mod parse;
pub mod prompts;

use std::future::Future;

use thiserror::Error;

use crate::{
    config::{ModelConfig, ProviderKind},
    conversation::{ToolCall, Turn},
    tools::ToolDefinition,
};

pub use ollama::OllamaModel;
pub use openai::OpenAiCompatModel;
pub use parse::parse_tool_calls_from_text;

/// What the model asked for on one round.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Final(String),
    ToolCalls { content: String, calls: Vec<ToolCall> },
}

impl ModelReply {
    pub fn from_parts(content: String, calls: Vec<ToolCall>) -> Self {
        if calls.is_empty() {
            Self::Final(content)
        } else {
            Self::ToolCalls { content, calls }
        }
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("failed to decode provider response: {0}")]
    Decode(String),

    #[error("provider returned an empty reply")]
    EmptyReply,

    #[error("ollama error: {0}")]
    Ollama(String),

    #[error("missing API key; set {0}")]
    MissingApiKey(&'static str),
}

pub trait ChatModel: Send + Sync {
    fn name(&self) -> &str;

    fn complete(
        &self,
        turns: &[Turn],
        tools: &[ToolDefinition],
    ) -> impl Future<Output = Result<ModelReply, ModelError>> + Send;
}

/// Model backend picked from configuration at startup.
pub enum Provider {
    OpenAiCompat(OpenAiCompatModel),
    Ollama(OllamaModel),
}

impl Provider {
    pub fn from_config(config: &ModelConfig) -> Result<Self, ModelError> {
        match config.provider {
            ProviderKind::OpenRouter => OpenAiCompatModel::new(config).map(Self::OpenAiCompat),
            ProviderKind::Ollama => OllamaModel::new(config).map(Self::Ollama),
        }
    }
}

impl ChatModel for Provider {
    fn name(&self) -> &str {
        match self {
            Self::OpenAiCompat(model) => model.name(),
            Self::Ollama(model) => model.name(),
        }
    }

    async fn complete(
        &self,
        turns: &[Turn],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, ModelError> {
        match self {
            Self::OpenAiCompat(model) => model.complete(turns, tools).await,
            Self::Ollama(model) => model.complete(turns, tools).await,
        }
    }
}
