//! Integration tests for the orchestration protocol
//!
//! Drives the line-oriented server with prompt templates loaded from disk.

use medmeter_engine::guidance::GuidanceCatalog;
use medmeter_engine::prompts::PromptStore;
use medmeter_engine::protocol::{serve, ProtocolHandler};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

async fn handler_with_prompts() -> (TempDir, ProtocolHandler) {
    let temp = TempDir::new().unwrap();
    tokio::fs::write(
        temp.path().join("medical_processor.prompt"),
        "Analyze {{document}} ({{analysis_type}})",
    )
    .await
    .unwrap();
    tokio::fs::write(temp.path().join("patient_summary.prompt"), "Summary for {{patient_id}}")
        .await
        .unwrap();
    tokio::fs::write(temp.path().join("notes.txt"), "not a template")
        .await
        .unwrap();

    let prompts = PromptStore::load(temp.path()).await.unwrap();
    let handler = ProtocolHandler::new(Arc::new(GuidanceCatalog::reference()), Arc::new(prompts));
    (temp, handler)
}

async fn run_session(handler: &ProtocolHandler, lines: &[Value]) -> Vec<Value> {
    let input: String = lines.iter().map(|l| format!("{}\n", l)).collect();
    let mut output = Vec::new();
    serve(handler, input.as_bytes(), &mut output).await.unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_session_answers_in_order() {
    let (_temp, handler) = handler_with_prompts().await;

    let responses = run_session(
        &handler,
        &[
            json!({"jsonrpc": "2.0", "id": 1, "method": "prompts/list"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/guidance", "params": {"task": "analyze_file"}}),
            json!({"jsonrpc": "2.0", "id": 3, "method": "prompts/get", "params": {
                "name": "medical_processor",
                "context": {"document": "BP 150/95", "analysis_type": "basic"}
            }}),
            json!({"jsonrpc": "2.0", "id": 4, "method": "tools/list"}),
        ],
    )
    .await;

    let ids: Vec<i64> = responses.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);

    let names: Vec<&str> = responses[0]["prompts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["medical_processor", "patient_summary"]);

    let guidance = &responses[1]["guidance"];
    assert_eq!(guidance["required_capabilities"], json!(["filesystem"]));
    assert_eq!(guidance["prompt_ref"], "medical_processor");
    assert_eq!(guidance["ordered_steps"].as_array().unwrap().len(), 3);

    assert_eq!(responses[2]["prompt"], "Analyze BP 150/95 (basic)");
    assert_eq!(responses[3]["tools"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_errors_do_not_stop_the_session() {
    let (_temp, handler) = handler_with_prompts().await;
    let input = concat!(
        "{not json\n",
        "{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"resources/list\"}\n",
        "{\"jsonrpc\":\"2.0\",\"id\":8,\"method\":\"prompts/get\",\"params\":{\"name\":42}}\n",
        "{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"prompts/get\",\"params\":{\"name\":\"missing\"}}\n",
    );
    let mut output = Vec::new();

    let handled = serve(&handler, input.as_bytes(), &mut output).await.unwrap();
    let responses: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(handled, 4);

    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[0]["error"]["code"], -32700);

    assert_eq!(responses[1]["id"], 7);
    assert_eq!(responses[1]["error"]["code"], -32601);
    assert_eq!(responses[1]["error"]["message"], "Unknown method: resources/list");

    assert_eq!(responses[2]["id"], 8);
    assert_eq!(responses[2]["error"]["code"], -32603);

    assert_eq!(responses[3]["prompt"], "No prompt found for: missing");
}

#[tokio::test]
async fn test_unknown_task_gets_fallback_guidance() {
    let (_temp, handler) = handler_with_prompts().await;

    let responses = run_session(
        &handler,
        &[json!({"method": "tools/guidance", "params": {"task": "translate_latin"}})],
    )
    .await;

    // Missing id defaults to 1
    assert_eq!(responses[0]["id"], 1);
    let guidance = &responses[0]["guidance"];
    assert_eq!(guidance["task_kind"], "translate_latin");
    assert_eq!(guidance["required_capabilities"], json!([]));
    assert_eq!(guidance["prompt_ref"], Value::Null);
}

#[tokio::test]
async fn test_blank_lines_are_parse_errors() {
    let (_temp, handler) = handler_with_prompts().await;
    let mut output = Vec::new();

    let handled = serve(&handler, "\n\n".as_bytes(), &mut output).await.unwrap();

    assert_eq!(handled, 2);
    for line in String::from_utf8(output).unwrap().lines() {
        let value: Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["error"]["code"], -32700);
    }
}
