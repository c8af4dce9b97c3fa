use std::fs;

#[test]
fn debug_events_reach_the_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent_debug.log");

    canyon::init_logging("warn", Some(&path)).unwrap();
    tracing::debug!(tool = "query_feeds", "tool_turn");
    tracing::info!(rounds = 2, "respond_done");

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("tool_turn"), "{contents}");
    assert!(contents.contains("tool=\"query_feeds\""), "{contents}");
    assert!(contents.contains("respond_done"), "{contents}");

    // a second subscriber cannot be installed
    assert!(canyon::init_logging("warn", None).is_err());
}
