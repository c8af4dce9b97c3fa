mod config_param;
mod query_feeds;
mod schema;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    config::{AgentConfig, DataPaths},
    conversation::ToolCall,
    error::Result as CanyonResult,
    preview,
    store::{ConfigStore, FeedStore, QueryError},
};

pub const QUERY_FEEDS: &str = "query_feeds";
pub const GET_CONFIG_PARAM: &str = "get_config_param";
pub const GET_SCHEMA: &str = "get_schema";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'; available tools are query_feeds, get_config_param, get_schema")]
    UnknownTool(String),

    #[error("invalid arguments for '{tool}': {detail}")]
    InvalidArguments { tool: String, detail: String },

    #[error("unknown config document '{0}'; expected 'encoder' or 'decoder'")]
    UnknownDocument(String),

    #[error("unknown schema type '{0}'; expected 'table', 'encoder' or 'decoder'")]
    UnknownSchemaType(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("lookup failed: {0}")]
    Lookup(String),
}

/// Tool description sent to the model, in the function-calling wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn to_wire(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// Everything a tool may read. Both stores are read-only after construction.
pub struct ToolContext {
    pub feeds: FeedStore,
    pub configs: ConfigStore,
}

impl ToolContext {
    pub fn new(feeds: FeedStore, configs: ConfigStore) -> Self {
        Self { feeds, configs }
    }

    pub fn open(paths: &DataPaths, agent: &AgentConfig) -> CanyonResult<Self> {
        let feeds = FeedStore::open_read_only(paths.db_path())?.with_max_rows(agent.max_rows);
        let configs = ConfigStore::load(paths)?;
        Ok(Self::new(feeds, configs))
    }
}

/// Definitions for every tool, in the order they are offered to the model.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        query_feeds::definition(),
        config_param::definition(),
        schema::definition(),
    ]
}

pub struct ToolSet {
    context: ToolContext,
}

impl ToolSet {
    pub fn new(context: ToolContext) -> Self {
        Self { context }
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        definitions()
    }

    /// Runs one call. The legacy names `execute_sql_query`, `get_parameter_value` and
    /// `get_schema_details` are accepted as aliases.
    pub fn execute(&self, call: &ToolCall) -> Result<String, ToolError> {
        info!(
            tool = %call.name,
            arguments = %preview(&call.arguments.to_string(), 200),
            "tool_call"
        );

        let result = self.dispatch(call);
        match &result {
            Ok(output) => info!(
                tool = %call.name,
                output_len = output.len(),
                output_preview = %preview(output, 200),
                "tool_result"
            ),
            Err(err) => warn!(tool = %call.name, error = %err, "tool_failed"),
        }

        result
    }

    fn dispatch(&self, call: &ToolCall) -> Result<String, ToolError> {
        match call.name.as_str() {
            QUERY_FEEDS | "execute_sql_query" => {
                query_feeds::run(&self.context, parse_args(&call.name, &call.arguments)?)
            }
            GET_CONFIG_PARAM | "get_parameter_value" => {
                config_param::run(&self.context, parse_args(&call.name, &call.arguments)?)
            }
            GET_SCHEMA | "get_schema_details" => {
                schema::run(&self.context, parse_args(&call.name, &call.arguments)?)
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: &Value) -> Result<T, ToolError> {
    let invalid = |detail: String| ToolError::InvalidArguments {
        tool: tool.to_string(),
        detail,
    };

    let arguments = match arguments {
        Value::String(raw) => {
            serde_json::from_str(raw).map_err(|e| invalid(format!("arguments are not JSON: {e}")))?
        }
        Value::Null => json!({}),
        other => other.clone(),
    };

    serde_json::from_value(arguments).map_err(|e| invalid(e.to_string()))
}
