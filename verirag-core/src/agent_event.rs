use serde::{Deserialize, Serialize};

/// Outward-facing progress of one question, as seen by a caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AgentEvent {
    Status {
        stage: String,
        message: String,
        step: usize,
        thread_id: String,
    },
    Observation {
        id: String,
        tool_name: String,
        output: String,
        step: usize,
    },
    Final {
        content: String,
        step: usize,
    },
    Error {
        message: String,
        step: usize,
        recoverable: bool,
        source: Option<String>,
    },
    Metadata {
        key: String,
        value: serde_json::Value,
    },
}

impl AgentEvent {
    pub fn step(&self) -> Option<usize> {
        match self {
            Self::Status { step, .. }
            | Self::Observation { step, .. }
            | Self::Final { step, .. }
            | Self::Error { step, .. } => Some(*step),
            Self::Metadata { .. } => None,
        }
    }

    pub fn thread_id(&self) -> Option<&str> {
        match self {
            Self::Status { thread_id, .. } => Some(thread_id.as_str()),
            _ => None,
        }
    }
}
