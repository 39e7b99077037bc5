use serde_json::json;
use verirag_core::AgentEvent;

use crate::RagError;

fn format_sse(event_type: &str, payload: serde_json::Value) -> String {
    format!("event: {event_type}\ndata: {payload}\n\n")
}

pub fn to_sse_event(event: &AgentEvent) -> String {
    match event {
        AgentEvent::Status {
            stage,
            message,
            step,
            thread_id,
        } => format_sse(
            "status",
            json!({
                "stage": stage,
                "message": message,
                "step": step,
                "thread_id": thread_id,
            }),
        ),
        AgentEvent::Observation {
            id,
            tool_name,
            output,
            step,
        } => format_sse(
            "trace",
            json!({
                "step": step,
                "call_id": id,
                "tool": tool_name,
                "observation": output,
            }),
        ),
        AgentEvent::Final { content, step } => format_sse(
            "answer",
            json!({
                "content": content,
                "step": step,
            }),
        ),
        AgentEvent::Error {
            message,
            step,
            recoverable,
            source,
        } => format_sse(
            "error",
            json!({
                "message": message,
                "step": step,
                "recoverable": recoverable,
                "source": source,
            }),
        ),
        AgentEvent::Metadata { key, value } => format_sse(
            "trace",
            json!({
                "metadata": {
                    "key": key,
                    "value": value,
                }
            }),
        ),
    }
}

/// Frame for a failed run. Run failures are never recoverable.
pub fn error_event(error: &RagError) -> String {
    to_sse_event(&AgentEvent::Error {
        message: error.to_string(),
        step: 0,
        recoverable: false,
        source: Some(error.source_kind().to_string()),
    })
}

pub fn ping_event() -> String {
    format_sse("ping", json!({}))
}

pub fn done_event() -> String {
    format_sse("done", json!({}))
}
