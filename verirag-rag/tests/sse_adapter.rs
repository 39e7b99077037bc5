use serde_json::Value;
use verirag_core::AgentEvent;
use verirag_rag::adapters::sse::{done_event, error_event, ping_event, to_sse_event};
use verirag_rag::RagError;

fn parse_sse(frame: &str) -> (&str, Value) {
    let mut event_type = "";
    let mut data = None;

    for line in frame.lines() {
        if let Some(rest) = line.strip_prefix("event: ") {
            event_type = rest;
        }
        if let Some(rest) = line.strip_prefix("data: ") {
            data = Some(serde_json::from_str(rest).expect("SSE data should be valid JSON"));
        }
    }

    (event_type, data.expect("SSE frame should include data"))
}

#[test]
fn sse_maps_status_to_status_event() {
    let event = AgentEvent::Status {
        stage: "routed".to_string(),
        message: "grade_documents: answerable -> generate".to_string(),
        step: 2,
        thread_id: "thread-1".to_string(),
    };

    let frame = to_sse_event(&event);
    let (event_type, data) = parse_sse(&frame);

    assert_eq!(event_type, "status");
    assert_eq!(data["stage"], "routed");
    assert_eq!(data["message"], "grade_documents: answerable -> generate");
    assert_eq!(data["thread_id"], "thread-1");
    assert!(frame.ends_with("\n\n"));
}

#[test]
fn sse_maps_final_to_answer_event() {
    let event = AgentEvent::Final {
        content: "Paris is the capital of France.\nIt lies on the Seine.".to_string(),
        step: 4,
    };

    let frame = to_sse_event(&event);
    let (event_type, data) = parse_sse(&frame);

    assert_eq!(event_type, "answer");
    assert_eq!(
        data["content"],
        "Paris is the capital of France.\nIt lies on the Seine."
    );
    assert_eq!(data["step"], 4);
}

#[test]
fn sse_maps_observation_to_trace() {
    let event = AgentEvent::Observation {
        id: "call-1".to_string(),
        tool_name: "retrieve_documents".to_string(),
        output: "docs".to_string(),
        step: 1,
    };

    let frame = to_sse_event(&event);
    let (event_type, data) = parse_sse(&frame);
    assert_eq!(event_type, "trace");
    assert_eq!(data["tool"], "retrieve_documents");
    assert_eq!(data["observation"], "docs");
}

#[test]
fn run_failures_become_error_frames() {
    let frame = error_event(&RagError::Runtime("boom".to_string()));
    let (event_type, data) = parse_sse(&frame);
    assert_eq!(event_type, "error");
    assert_eq!(data["message"], "runtime error: boom");
    assert_eq!(data["recoverable"], false);
    assert_eq!(data["source"], "runtime");
}

#[test]
fn sse_exposes_ping_and_done_frames() {
    let ping_frame = ping_event();
    let done_frame = done_event();
    let (ping_type, ping_data) = parse_sse(&ping_frame);
    let (done_type, done_data) = parse_sse(&done_frame);

    assert_eq!(ping_type, "ping");
    assert_eq!(done_type, "done");
    assert!(ping_data.as_object().unwrap().is_empty());
    assert!(done_data.as_object().unwrap().is_empty());
}
