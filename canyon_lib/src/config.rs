use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use crate::{
    error::{CanyonError, Result},
    store::DocumentKind,
};

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_OPENROUTER_MODEL: &str = "deepseek/deepseek-chat";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "qwen3";

#[derive(Debug, Clone)]
pub struct DataPaths {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: impl Into<PathBuf>, db_path: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            db_path: db_path.into(),
        }
    }

    pub fn feeds_csv(&self) -> PathBuf {
        self.data_dir.join("Table_feeds_v2.csv")
    }

    pub fn definitions_csv(&self) -> PathBuf {
        self.data_dir.join("Table_defs_v2.csv")
    }

    pub fn params_path(&self, kind: DocumentKind) -> PathBuf {
        self.data_dir.join(format!("{}_params.json", kind.as_str()))
    }

    pub fn schema_path(&self, kind: DocumentKind) -> PathBuf {
        self.data_dir.join(format!("{}_schema.json", kind.as_str()))
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::new("data", "canyon_code.db")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenRouter,
    Ollama,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenRouter => "openrouter",
            Self::Ollama => "ollama",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = CanyonError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openrouter" | "openai" => Ok(Self::OpenRouter),
            "ollama" => Ok(Self::Ollama),
            other => Err(CanyonError::Config(format!(
                "unknown provider '{other}'; expected 'openrouter' or 'ollama'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl ModelConfig {
    pub fn for_provider(provider: ProviderKind) -> Self {
        let (model, base_url) = match provider {
            ProviderKind::OpenRouter => (DEFAULT_OPENROUTER_MODEL, DEFAULT_OPENROUTER_URL),
            ProviderKind::Ollama => (DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL),
        };

        Self {
            provider,
            model: model.to_string(),
            base_url: base_url.to_string(),
            api_key: None,
            temperature: 0.0,
            request_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_provider(self, provider: ProviderKind) -> Self {
        if provider == self.provider {
            return self;
        }
        Self {
            api_key: self.api_key,
            ..Self::for_provider(provider)
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::for_provider(ProviderKind::OpenRouter)
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Tool-call rounds allowed per user message before the agent gives up.
    pub max_tool_rounds: usize,
    /// Rows returned by a single `query_feeds` call.
    pub max_rows: usize,
    /// Replaces the built-in system prompt when set.
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 6,
            max_rows: 200,
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CanyonConfig {
    pub data: DataPaths,
    pub model: ModelConfig,
    pub agent: AgentConfig,
    /// Debug log file appended to alongside stderr output.
    pub log_file: Option<PathBuf>,
}

impl CanyonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = lookup("CANYON_DATA_DIR") {
            config.data.data_dir = dir.into();
        }
        if let Some(db) = lookup("CANYON_DB") {
            config.data.db_path = db.into();
        }
        if let Some(provider) = lookup("CANYON_PROVIDER") {
            config.model = config.model.with_provider(provider.parse()?);
        }
        if config.model.provider == ProviderKind::Ollama {
            if let Some(host) = lookup("OLLAMA_HOST") {
                config.model.base_url = host;
            }
        }
        if let Some(url) = lookup("CANYON_BASE_URL") {
            config.model.base_url = url;
        }
        if let Some(model) = lookup("CANYON_MODEL") {
            config.model = config.model.with_model(model);
        }
        config.model.api_key = lookup(API_KEY_ENV);

        if let Some(rounds) = lookup("CANYON_MAX_ROUNDS") {
            config.agent.max_tool_rounds = rounds.trim().parse().map_err(|e| {
                CanyonError::Config(format!("CANYON_MAX_ROUNDS must be a number: {e}"))
            })?;
        }
        config.log_file = lookup("CANYON_LOG_FILE").map(PathBuf::from);

        Ok(config)
    }
}
