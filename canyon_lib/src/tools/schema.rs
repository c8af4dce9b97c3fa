use serde::Deserialize;
use serde_json::{Value, json};

use super::{GET_SCHEMA, ToolContext, ToolDefinition, ToolError};
use crate::store::{ColumnDefinition, DocumentKind};

#[derive(Debug, Default, Deserialize)]
pub(super) struct SchemaArgs {
    #[serde(default, alias = "type", alias = "document")]
    schema_type: Option<String>,
    #[serde(default, alias = "parameter", alias = "key")]
    parameter_name: Option<String>,
}

enum SchemaTarget {
    Table,
    Config(DocumentKind),
}

impl SchemaTarget {
    fn parse(name: &str) -> Result<Self, ToolError> {
        if name.trim().eq_ignore_ascii_case("table") {
            return Ok(Self::Table);
        }
        DocumentKind::parse(name)
            .map(Self::Config)
            .ok_or_else(|| ToolError::UnknownSchemaType(name.to_string()))
    }
}

pub(super) fn definition() -> ToolDefinition {
    ToolDefinition {
        name: GET_SCHEMA.to_string(),
        description: concat!(
            "Describe fields and their allowed values. schema_type 'table' covers camera_feeds ",
            "columns; 'encoder' and 'decoder' cover configuration parameters. Give parameter_name ",
            "for one field, or omit it for the whole schema. Omit both for everything."
        )
        .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "schema_type": {
                    "type": "string",
                    "enum": ["table", "encoder", "decoder"]
                },
                "parameter_name": {
                    "type": "string",
                    "description": "Column or parameter name, e.g. THEATER or preset"
                }
            }
        }),
    }
}

pub(super) fn run(context: &ToolContext, args: SchemaArgs) -> Result<String, ToolError> {
    let parameter = args
        .parameter_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let body = match (args.schema_type.as_deref(), parameter) {
        (None, None) => everything(context)?,
        (None, Some(name)) => search_all(context, name)?,
        (Some(kind), None) => match SchemaTarget::parse(kind)? {
            SchemaTarget::Table => table_schema(context)?,
            SchemaTarget::Config(kind) => context.configs.schema(kind).raw().clone(),
        },
        (Some(kind), Some(name)) => match SchemaTarget::parse(kind)? {
            SchemaTarget::Table => table_field(context, name)?,
            SchemaTarget::Config(kind) => config_field(context, kind, name),
        },
    };

    Ok(body.to_string())
}

fn everything(context: &ToolContext) -> Result<Value, ToolError> {
    Ok(json!({
        "table": table_schema(context)?,
        "encoder": context.configs.schema(DocumentKind::Encoder).raw(),
        "decoder": context.configs.schema(DocumentKind::Decoder).raw(),
    }))
}

/// Without a schema type, try the table first, then each config schema.
fn search_all(context: &ToolContext, name: &str) -> Result<Value, ToolError> {
    let table = table_field(context, name)?;
    if table["found"] == json!(true) {
        return Ok(table);
    }
    for kind in DocumentKind::ALL {
        let field = config_field(context, kind, name);
        if field["found"] == json!(true) {
            return Ok(field);
        }
    }
    Ok(not_found("any", name))
}

fn table_schema(context: &ToolContext) -> Result<Value, ToolError> {
    let definitions = context
        .feeds
        .column_definitions()
        .map_err(|e| ToolError::Lookup(e.to_string()))?;
    let columns: serde_json::Map<String, Value> = definitions
        .into_iter()
        .map(|definition| (definition.header.clone(), describe_column(&definition)))
        .collect();
    Ok(json!({ "schema_type": "table", "columns": columns }))
}

fn table_field(context: &ToolContext, name: &str) -> Result<Value, ToolError> {
    let definition = context
        .feeds
        .column_definition(name)
        .map_err(|e| ToolError::Lookup(e.to_string()))?;

    Ok(match definition {
        Some(definition) => json!({
            "schema_type": "table",
            "parameter": definition.header,
            "found": true,
            "definition": describe_column(&definition),
        }),
        None => not_found("table", name),
    })
}

fn config_field(context: &ToolContext, kind: DocumentKind, name: &str) -> Value {
    match context.configs.schema(kind).property(name) {
        Some(property) => json!({
            "schema_type": kind.as_str(),
            "parameter": name,
            "found": true,
            "definition": property,
        }),
        None => not_found(kind.as_str(), name),
    }
}

fn describe_column(definition: &ColumnDefinition) -> Value {
    json!({
        "type": definition.kind,
        "allowed_values": definition.allowed_values,
        "description": definition.description,
    })
}

fn not_found(schema_type: &str, name: &str) -> Value {
    json!({
        "schema_type": schema_type,
        "parameter": name,
        "found": false,
        "message": format!("no definition for '{name}' in the {schema_type} schema"),
    })
}
