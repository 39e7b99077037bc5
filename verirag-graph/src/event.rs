use crate::{StateSchema, StateUpdate};

/// One observable step of a run, in the order it happened.
#[derive(Debug, Clone)]
pub enum GraphEvent<S: StateSchema> {
    NodeStarted {
        node: String,
        step: usize,
    },
    NodeCompleted {
        node: String,
        step: usize,
        update: StateUpdate<S>,
    },
    Routed {
        node: String,
        step: usize,
        label: &'static str,
        next: &'static str,
    },
    CheckpointSaved {
        node: String,
        step: usize,
    },
}

impl<S: StateSchema> GraphEvent<S> {
    pub fn node(&self) -> &str {
        match self {
            Self::NodeStarted { node, .. }
            | Self::NodeCompleted { node, .. }
            | Self::Routed { node, .. }
            | Self::CheckpointSaved { node, .. } => node,
        }
    }

    pub fn step(&self) -> usize {
        match self {
            Self::NodeStarted { step, .. }
            | Self::NodeCompleted { step, .. }
            | Self::Routed { step, .. }
            | Self::CheckpointSaved { step, .. } => *step,
        }
    }
}
