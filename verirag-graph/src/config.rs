use tokio::sync::mpsc;

use crate::{GraphEvent, StateSchema};

#[derive(Clone, Debug)]
pub struct ExecutionConfig {
    /// Ceiling on node executions per run, counting conditional nodes.
    pub max_steps: Option<usize>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self { max_steps: Some(10) }
    }
}

impl ExecutionConfig {
    pub fn merge<S: StateSchema>(&self, overrides: &ExecutionOptions<S>) -> Self {
        Self {
            max_steps: overrides.max_steps.or(self.max_steps),
        }
    }
}

pub struct ExecutionOptions<S: StateSchema> {
    pub max_steps: Option<usize>,
    pub event_sender: Option<mpsc::Sender<GraphEvent<S>>>,
}

impl<S: StateSchema> Default for ExecutionOptions<S> {
    fn default() -> Self {
        Self {
            max_steps: None,
            event_sender: None,
        }
    }
}

impl<S: StateSchema> Clone for ExecutionOptions<S> {
    fn clone(&self) -> Self {
        Self {
            max_steps: self.max_steps,
            event_sender: self.event_sender.clone(),
        }
    }
}
