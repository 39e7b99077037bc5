mod checkpoint;
mod config;
mod error;
mod event;
mod file_checkpointer;
mod graph;
mod locks;
mod reducer;
mod route;
mod state;

pub use checkpoint::{
    Checkpoint, CheckpointMetadata, Checkpointer, HistoryCheckpointer, InMemoryCheckpointer,
};
pub use config::{ExecutionConfig, ExecutionOptions};
pub use error::GraphError;
pub use event::GraphEvent;
pub use file_checkpointer::{CheckpointRecord, FileCheckpointer};
pub use graph::{ExecutableGraph, GraphBuilder, RunOutcome, StepResult, END, INPUT_NODE};
pub use locks::{ThreadLockGuard, ThreadLocks};
pub use reducer::{Append, Reducer};
pub use route::{Decision, RouteLabel, Router};
pub use state::{GraphState, StateSchema, StateUpdate};
