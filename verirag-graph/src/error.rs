use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("checkpoint failed: {0}")]
    Checkpoint(String),
    #[error("node failed: {node}: {source}")]
    NodeFailed {
        node: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("missing node: {node}")]
    MissingNode { node: String },
    #[error("graph has no entry node")]
    MissingEntry,
    #[error("node '{node}' has no successor")]
    MissingSuccessor { node: String },
    #[error("invalid edge to '{node}'")]
    InvalidEdge { node: String },
    #[error("node '{node}' is conditional and cannot also have a static edge")]
    ConflictingEdge { node: String },
    #[error("route '{label}' of node '{node}' targets unknown node '{target}'")]
    UnroutedLabel {
        node: String,
        label: &'static str,
        target: &'static str,
    },
    #[error("Max steps exceeded: reached {reached}, limit {max}")]
    MaxStepsExceeded { max: usize, reached: usize },
    #[error("graph run task failed: {0}")]
    Join(String),
}
