use serde::Deserialize;
use serde_json::json;

use super::{GET_CONFIG_PARAM, ToolContext, ToolDefinition, ToolError};
use crate::store::DocumentKind;

#[derive(Debug, Deserialize)]
pub(super) struct ConfigParamArgs {
    #[serde(alias = "config_type")]
    document: String,
    #[serde(alias = "parameter_name", alias = "param")]
    key: String,
}

pub(super) fn definition() -> ToolDefinition {
    ToolDefinition {
        name: GET_CONFIG_PARAM.to_string(),
        description: "Look up the current value of one encoder or decoder configuration parameter."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "document": {
                    "type": "string",
                    "enum": ["encoder", "decoder"],
                    "description": "Which configuration to read"
                },
                "key": {
                    "type": "string",
                    "description": "Parameter name; nested values use dots, e.g. rate_control.mode"
                }
            },
            "required": ["document", "key"]
        }),
    }
}

/// A missing key is an answer (`found: false`), not a tool failure.
pub(super) fn run(context: &ToolContext, args: ConfigParamArgs) -> Result<String, ToolError> {
    let kind = DocumentKind::parse(&args.document)
        .ok_or_else(|| ToolError::UnknownDocument(args.document.clone()))?;
    let key = args.key.trim();

    let body = match context.configs.param(kind, key) {
        Some(value) => json!({
            "document": kind.as_str(),
            "parameter": key,
            "found": true,
            "value": value,
        }),
        None => json!({
            "document": kind.as_str(),
            "parameter": key,
            "found": false,
            "message": format!("parameter '{key}' is not set in the {kind} configuration"),
        }),
    };

    Ok(body.to_string())
}
