use serde::Deserialize;
use serde_json::json;

use super::{QUERY_FEEDS, ToolContext, ToolDefinition, ToolError};

#[derive(Debug, Deserialize)]
pub(super) struct QueryFeedsArgs {
    #[serde(alias = "sql_query", alias = "query")]
    sql: String,
}

pub(super) fn definition() -> ToolDefinition {
    ToolDefinition {
        name: QUERY_FEEDS.to_string(),
        description: concat!(
            "Run one read-only SQL SELECT against the SQLite feed database and return the rows ",
            "as a text table. Tables: camera_feeds (FEED_ID, THEATER, FRRATE, RES_W, RES_H, CODEC, ",
            "ENCR, LAT_MS, MODL_TAG, CIV_OK, CLARITY) and table_definitions (header, type, ",
            "allowed_values, description)."
        )
        .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "sql": {
                    "type": "string",
                    "description": "A single SELECT statement, e.g. SELECT FEED_ID, LAT_MS FROM camera_feeds ORDER BY LAT_MS DESC LIMIT 5"
                }
            },
            "required": ["sql"]
        }),
    }
}

pub(super) fn run(context: &ToolContext, args: QueryFeedsArgs) -> Result<String, ToolError> {
    let rows = context.feeds.query(&args.sql)?;
    Ok(rows.render_table())
}
