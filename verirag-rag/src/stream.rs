use verirag_core::{AgentEvent, Role};
use verirag_graph::{GraphEvent, StateUpdate};

use crate::graph::{RETRIEVE, TERMINAL_NODES};
use crate::state::ConversationState;

fn is_terminal(node: &str) -> bool {
    TERMINAL_NODES.contains(&node)
}

fn assistant_content(update: &StateUpdate<ConversationState>) -> Option<String> {
    update
        .data
        .messages
        .iter()
        .rev()
        .find(|message| message.role == Role::Assistant)
        .map(|message| message.content.clone())
}

/// Tracks the terminal-producing node outputs of a run.
///
/// Only the latest candidate is kept and nothing is released until the run
/// has succeeded, so a generation later replaced by the fallback answer never
/// reaches the caller.
#[derive(Debug, Default)]
pub struct TerminalFilter {
    candidate: Option<String>,
}

impl TerminalFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, event: &GraphEvent<ConversationState>) {
        if let GraphEvent::NodeCompleted { node, update, .. } = event {
            if is_terminal(node) {
                if let Some(content) = assistant_content(update) {
                    self.candidate = Some(content);
                }
            }
        }
    }

    pub fn candidate(&self) -> Option<&str> {
        self.candidate.as_deref()
    }

    pub fn finish(self) -> Option<String> {
        self.candidate
    }
}

/// Progress events for callers. Terminal answers are left to [`TerminalFilter`].
pub fn to_agent_event(event: &GraphEvent<ConversationState>, thread_id: &str) -> Option<AgentEvent> {
    let status = |stage: &str, message: String, step: usize| AgentEvent::Status {
        stage: stage.to_string(),
        message,
        step,
        thread_id: thread_id.to_string(),
    };

    match event {
        GraphEvent::NodeStarted { node, step } => Some(status("node_start", node.clone(), *step)),
        GraphEvent::Routed {
            node,
            step,
            label,
            next,
        } => Some(status("routed", format!("{node}: {label} -> {next}"), *step)),
        GraphEvent::NodeCompleted { node, step, update } if node == RETRIEVE => {
            let message = update.data.messages.last()?;
            Some(AgentEvent::Observation {
                id: message.tool_call_id.clone().unwrap_or_default(),
                tool_name: message.tool_name.clone().unwrap_or_default(),
                output: message.content.clone(),
                step: *step,
            })
        }
        GraphEvent::NodeCompleted { node, step, .. } => {
            Some(status("node_end", node.clone(), *step))
        }
        GraphEvent::CheckpointSaved { .. } => None,
    }
}
