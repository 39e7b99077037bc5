//! Plain-text rendering of a question's event stream: the terminal answer,
//! or a single `Error: ...` line.

use std::fmt::Display;

use verirag_core::AgentEvent;

use crate::RagError;

pub fn error_line(error: impl Display) -> String {
    format!("Error: {error}\n")
}

pub fn to_line(item: &Result<AgentEvent, RagError>) -> Option<String> {
    match item {
        Ok(AgentEvent::Final { content, .. }) => Some(content.clone()),
        Ok(AgentEvent::Error { message, .. }) => Some(error_line(message)),
        Ok(_) => None,
        Err(error) => Some(error_line(error)),
    }
}
