mod common;

use canyon::{
    conversation::ToolCall,
    store::QueryError,
    tools::{ToolError, ToolSet},
};
use common::Fixture;
use serde_json::{Value, json};

fn call(name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: "call_0".to_string(),
        name: name.to_string(),
        arguments,
    }
}

fn as_json(output: &str) -> Value {
    serde_json::from_str(output).unwrap()
}

#[test]
fn select_renders_an_aligned_table() {
    let fixture = Fixture::ingested();
    let tools = ToolSet::new(fixture.tool_context());

    let output = tools
        .execute(&call(
            "query_feeds",
            json!({ "sql": "SELECT FEED_ID, LAT_MS FROM camera_feeds ORDER BY LAT_MS DESC LIMIT 2" }),
        ))
        .unwrap();

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("FEED_ID") && lines[0].contains("LAT_MS"));
    assert!(lines[1].contains("FD-ML64LG") && lines[1].contains("452.7"));
    assert!(lines[2].contains("FD-EUR001"));
}

#[test]
fn empty_result_says_so() {
    let fixture = Fixture::ingested();
    let tools = ToolSet::new(fixture.tool_context());

    let output = tools
        .execute(&call(
            "execute_sql_query",
            json!({ "sql_query": "SELECT * FROM camera_feeds WHERE THEATER = 'ARC'" }),
        ))
        .unwrap();
    assert_eq!(output, "No results found.");
}

#[test]
fn writes_are_rejected_without_touching_rows() {
    let fixture = Fixture::ingested();
    let tools = ToolSet::new(fixture.tool_context());

    let attempts = [
        "DELETE FROM camera_feeds",
        "DROP TABLE camera_feeds",
        "UPDATE camera_feeds SET CLARITY = 0",
        "SELECT 1; DELETE FROM camera_feeds",
        "WITH doomed AS (SELECT 1) DELETE FROM camera_feeds",
        "PRAGMA query_only = OFF",
    ];
    for sql in attempts {
        let err = tools
            .execute(&call("query_feeds", json!({ "sql": sql })))
            .unwrap_err();
        assert!(matches!(err, ToolError::Query(_)), "{sql}: {err}");
    }

    assert_eq!(fixture.feed_store().feed_count().unwrap(), 5);
}

#[test]
fn commented_select_is_accepted() {
    let fixture = Fixture::ingested();
    let tools = ToolSet::new(fixture.tool_context());

    let output = tools
        .execute(&call(
            "query_feeds",
            json!({ "sql": "-- top latency\nSELECT FEED_ID FROM camera_feeds ORDER BY LAT_MS DESC LIMIT 1; -- done" }),
        ))
        .unwrap();
    assert!(output.contains("FD-ML64LG"));
}

#[test]
fn bad_sql_is_a_query_error() {
    let fixture = Fixture::ingested();
    let tools = ToolSet::new(fixture.tool_context());

    let err = tools
        .execute(&call("query_feeds", json!({ "sql": "SELECT nope FROM camera_feeds" })))
        .unwrap_err();
    assert!(matches!(err, ToolError::Query(QueryError::Sql(_))), "{err}");
    assert!(err.to_string().contains("nope"));
}

#[test]
fn config_values_and_not_found() {
    let fixture = Fixture::ingested();
    let tools = ToolSet::new(fixture.tool_context());

    let found = as_json(
        &tools
            .execute(&call(
                "get_config_param",
                json!({ "document": "encoder", "key": "preset" }),
            ))
            .unwrap(),
    );
    assert_eq!(found["found"], true);
    assert_eq!(found["value"], "medium");

    let nested = as_json(
        &tools
            .execute(&call(
                "get_parameter_value",
                json!({ "config_type": "encoder", "parameter_name": "rate_control.max_bitrate_kbps" }),
            ))
            .unwrap(),
    );
    assert_eq!(nested["value"], 8000);

    let missing = as_json(
        &tools
            .execute(&call(
                "get_config_param",
                json!({ "document": "decoder", "key": "gop_size" }),
            ))
            .unwrap(),
    );
    assert_eq!(missing["found"], false);
    assert_eq!(missing["document"], "decoder");
}

#[test]
fn unknown_document_is_a_tool_error() {
    let fixture = Fixture::ingested();
    let tools = ToolSet::new(fixture.tool_context());

    let err = tools
        .execute(&call(
            "get_config_param",
            json!({ "document": "muxer", "key": "preset" }),
        ))
        .unwrap_err();
    assert!(matches!(err, ToolError::UnknownDocument(name) if name == "muxer"));
}

#[test]
fn schema_lookups() {
    let fixture = Fixture::ingested();
    let tools = ToolSet::new(fixture.tool_context());

    let column = as_json(
        &tools
            .execute(&call(
                "get_schema",
                json!({ "schema_type": "table", "parameter_name": "CODEC" }),
            ))
            .unwrap(),
    );
    assert_eq!(column["found"], true);
    assert_eq!(
        column["definition"]["allowed_values"],
        "H264, H265, VP9, MPEG2, AV1"
    );

    let property = as_json(
        &tools
            .execute(&call(
                "get_schema",
                json!({ "schema_type": "decoder", "parameter_name": "threads" }),
            ))
            .unwrap(),
    );
    assert_eq!(property["definition"]["type"], "integer");

    let nested = as_json(
        &tools
            .execute(&call(
                "get_schema",
                json!({ "schema_type": "encoder", "parameter_name": "rate_control.mode" }),
            ))
            .unwrap(),
    );
    assert_eq!(nested["found"], true);
    assert_eq!(nested["definition"]["enum"][2], "crf");

    let whole = as_json(
        &tools
            .execute(&call("get_schema", json!({ "schema_type": "encoder" })))
            .unwrap(),
    );
    assert_eq!(whole["properties"]["preset"]["enum"][1], "medium");

    let everything = as_json(&tools.execute(&call("get_schema", json!({}))).unwrap());
    assert!(everything["table"]["columns"]["THEATER"].is_object());
    assert!(everything["decoder"]["properties"]["threads"].is_object());
}

#[test]
fn schema_not_found_is_not_an_error() {
    let fixture = Fixture::ingested();
    let tools = ToolSet::new(fixture.tool_context());

    for args in [
        json!({ "schema_type": "table", "parameter_name": "SIGNAL_DB" }),
        json!({ "schema_type": "encoder", "parameter_name": "tune" }),
        json!({ "parameter_name": "' OR 1=1 --" }),
    ] {
        let output = as_json(&tools.execute(&call("get_schema", args)).unwrap());
        assert_eq!(output["found"], false);
    }

    let err = tools
        .execute(&call("get_schema", json!({ "schema_type": "muxer" })))
        .unwrap_err();
    assert!(matches!(err, ToolError::UnknownSchemaType(_)));
}

#[test]
fn unknown_tool_and_bad_arguments() {
    let fixture = Fixture::ingested();
    let tools = ToolSet::new(fixture.tool_context());

    let err = tools.execute(&call("drop_everything", json!({}))).unwrap_err();
    assert!(matches!(err, ToolError::UnknownTool(_)));

    let err = tools
        .execute(&call("query_feeds", json!({ "statement": "SELECT 1" })))
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidArguments { .. }));

    let output = tools
        .execute(&call("query_feeds", json!("{\"sql\": \"SELECT COUNT(*) AS n FROM camera_feeds\"}")))
        .unwrap();
    assert!(output.contains('5'));
}

#[test]
fn definitions_cover_all_tools() {
    let fixture = Fixture::ingested();
    let tools = ToolSet::new(fixture.tool_context());

    let names: Vec<String> = tools.definitions().into_iter().map(|d| d.name).collect();
    assert_eq!(names, ["query_feeds", "get_config_param", "get_schema"]);
}
