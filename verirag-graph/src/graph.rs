use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::Instrument;
use verirag_core::Runnable;

use crate::route::{ErasedRouter, RoutedNode};
use crate::{
    Checkpoint, Checkpointer, ExecutionConfig, ExecutionOptions, GraphError, GraphEvent,
    GraphState, Router, StateSchema, StateUpdate, ThreadLocks,
};

/// Terminal marker: routing here ends the run.
pub const END: &str = "__end__";

/// Node name recorded on the checkpoint written after the caller's input is merged.
pub const INPUT_NODE: &str = "__input__";

type BoxedNode<S> = Box<dyn Runnable<GraphState<S>, StateUpdate<S>> + Send + Sync>;

enum NodeKind<S: StateSchema> {
    Plain(BoxedNode<S>),
    Conditional(Box<dyn ErasedRouter<S>>),
}

pub struct GraphBuilder<S: StateSchema> {
    nodes: HashMap<String, NodeKind<S>>,
    edges: HashMap<String, String>,
    entry: Option<String>,
    checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    config: ExecutionConfig,
    locks: ThreadLocks,
}

impl<S: StateSchema> Default for GraphBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: StateSchema> GraphBuilder<S> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry: None,
            checkpointer: None,
            config: ExecutionConfig::default(),
            locks: ThreadLocks::default(),
        }
    }

    /// Registers a state-producing node. It needs exactly one outgoing edge.
    pub fn add_node<R>(mut self, name: &str, node: R) -> Self
    where
        R: Runnable<GraphState<S>, StateUpdate<S>> + Send + Sync + 'static,
    {
        self.nodes
            .insert(name.to_string(), NodeKind::Plain(Box::new(node)));
        self
    }

    /// Registers a decision node. `table` maps every route to a node name or
    /// [`END`]; writing it as a `match` keeps it exhaustive.
    pub fn add_conditional_node<R, F>(mut self, name: &str, router: R, table: F) -> Self
    where
        R: Router<S> + 'static,
        F: Fn(R::Route) -> &'static str + Send + Sync + 'static,
    {
        self.nodes.insert(
            name.to_string(),
            NodeKind::Conditional(Box::new(RoutedNode::new(router, table))),
        );
        self
    }

    pub fn add_edge(mut self, from: &str, to: &str) -> Self {
        self.edges.insert(from.to_string(), to.to_string());
        self
    }

    pub fn set_entry(mut self, name: &str) -> Self {
        self.entry = Some(name.to_string());
        self
    }

    pub fn with_checkpointer<C>(mut self, checkpointer: C) -> Self
    where
        C: Checkpointer<S> + 'static,
    {
        self.checkpointer = Some(Arc::new(checkpointer));
        self
    }

    pub fn with_shared_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer<S>>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares per-thread locks with other graphs writing to the same checkpointer.
    pub fn with_thread_locks(mut self, locks: ThreadLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn build(self) -> Result<ExecutableGraph<S>, GraphError> {
        let entry = self.entry.ok_or(GraphError::MissingEntry)?;
        if !self.nodes.contains_key(&entry) {
            return Err(GraphError::MissingNode { node: entry });
        }

        for (from, to) in &self.edges {
            match self.nodes.get(from) {
                None => return Err(GraphError::MissingNode { node: from.clone() }),
                Some(NodeKind::Conditional(_)) => {
                    return Err(GraphError::ConflictingEdge { node: from.clone() })
                }
                Some(NodeKind::Plain(_)) => {}
            }
            if to != END && !self.nodes.contains_key(to) {
                return Err(GraphError::InvalidEdge { node: to.clone() });
            }
        }

        for (name, node) in &self.nodes {
            match node {
                NodeKind::Plain(_) => {
                    if !self.edges.contains_key(name) {
                        return Err(GraphError::MissingSuccessor { node: name.clone() });
                    }
                }
                NodeKind::Conditional(router) => {
                    for decision in router.table() {
                        if decision.next != END && !self.nodes.contains_key(decision.next) {
                            return Err(GraphError::UnroutedLabel {
                                node: name.clone(),
                                label: decision.label,
                                target: decision.next,
                            });
                        }
                    }
                }
            }
        }

        Ok(ExecutableGraph {
            nodes: self.nodes,
            edges: self.edges,
            entry,
            checkpointer: self.checkpointer,
            config: self.config,
            locks: self.locks,
        })
    }
}

/// The state delta of one plain-node execution.
#[derive(Debug, Clone)]
pub struct StepResult<S: StateSchema> {
    pub node: String,
    pub update: StateUpdate<S>,
}

#[derive(Debug, Clone)]
pub struct RunOutcome<S: StateSchema> {
    pub state: GraphState<S>,
    pub steps: Vec<StepResult<S>>,
}

pub struct ExecutableGraph<S: StateSchema> {
    nodes: HashMap<String, NodeKind<S>>,
    edges: HashMap<String, String>,
    entry: String,
    checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    config: ExecutionConfig,
    locks: ThreadLocks,
}

impl<S: StateSchema> ExecutableGraph<S> {
    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn node_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.nodes.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn thread_locks(&self) -> &ThreadLocks {
        &self.locks
    }

    /// Runs the graph once from the entry node without touching any checkpoint.
    pub async fn invoke(&self, state: GraphState<S>) -> Result<GraphState<S>, GraphError> {
        let outcome = self.execute(None, state, ExecutionOptions::default()).await?;
        Ok(outcome.state)
    }

    /// Loads the thread's checkpoint, merges `input`, and runs to [`END`].
    ///
    /// Runs on the same thread id are serialized. Every completed plain node is
    /// checkpointed, so a failed or abandoned run keeps its finished steps.
    pub async fn run(
        &self,
        thread_id: &str,
        input: StateUpdate<S>,
        options: ExecutionOptions<S>,
    ) -> Result<RunOutcome<S>, GraphError> {
        let span = tracing::info_span!("graph_run", thread_id = %thread_id);
        async move {
            let _guard = self.locks.acquire(thread_id).await;

            let state = match &self.checkpointer {
                Some(checkpointer) => checkpointer
                    .load(thread_id)
                    .await?
                    .map(|checkpoint| checkpoint.state)
                    .unwrap_or_default(),
                None => GraphState::default(),
            };

            let state = state.apply(input);
            self.save(Some(thread_id), &state, 0, INPUT_NODE, &options)
                .await?;
            self.execute(Some(thread_id), state, options).await
        }
        .instrument(span)
        .await
    }

    /// Spawns [`run`](Self::run) and returns its step events as they happen.
    /// The event stream ends when the run does; the handle yields the outcome.
    pub fn stream(
        self: Arc<Self>,
        thread_id: impl Into<String>,
        input: StateUpdate<S>,
        buffer: usize,
    ) -> (
        ReceiverStream<GraphEvent<S>>,
        JoinHandle<Result<RunOutcome<S>, GraphError>>,
    ) {
        let thread_id = thread_id.into();
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let options = ExecutionOptions {
            event_sender: Some(tx),
            ..ExecutionOptions::default()
        };
        let handle = tokio::spawn(async move { self.run(&thread_id, input, options).await });
        (ReceiverStream::new(rx), handle)
    }

    async fn execute(
        &self,
        thread_id: Option<&str>,
        mut state: GraphState<S>,
        options: ExecutionOptions<S>,
    ) -> Result<RunOutcome<S>, GraphError> {
        let config = self.config.merge(&options);
        let mut steps = Vec::new();
        let mut executed = 0usize;
        let mut current = self.entry.clone();

        while current != END {
            if let Some(max) = config.max_steps {
                if executed >= max {
                    tracing::error!(node = %current, max, "step budget exhausted");
                    self.save(thread_id, &state, executed, &current, &options)
                        .await?;
                    return Err(GraphError::MaxStepsExceeded {
                        max,
                        reached: executed + 1,
                    });
                }
            }
            executed += 1;

            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| GraphError::MissingNode {
                    node: current.clone(),
                })?;
            emit(
                &options,
                GraphEvent::NodeStarted {
                    node: current.clone(),
                    step: executed,
                },
            )
            .await;

            match node {
                NodeKind::Plain(runnable) => {
                    let span = tracing::debug_span!("node", node = %current, step = executed);
                    let update = runnable
                        .invoke(state.clone())
                        .instrument(span)
                        .await
                        .map_err(|err| {
                            tracing::warn!(node = %current, error = %err, "node failed");
                            GraphError::NodeFailed {
                                node: current.clone(),
                                source: Box::new(err),
                            }
                        })?;
                    state = state.apply(update.clone());
                    self.save(thread_id, &state, executed, &current, &options)
                        .await?;
                    emit(
                        &options,
                        GraphEvent::NodeCompleted {
                            node: current.clone(),
                            step: executed,
                            update: update.clone(),
                        },
                    )
                    .await;
                    steps.push(StepResult {
                        node: current.clone(),
                        update,
                    });

                    current = self
                        .edges
                        .get(&current)
                        .cloned()
                        .ok_or_else(|| GraphError::MissingSuccessor {
                            node: current.clone(),
                        })?;
                }
                NodeKind::Conditional(router) => {
                    let decision = router.decide(&state).await.map_err(|err| {
                        tracing::warn!(node = %current, error = %err, "router failed");
                        GraphError::NodeFailed {
                            node: current.clone(),
                            source: Box::new(err),
                        }
                    })?;
                    tracing::info!(
                        node = %current,
                        label = decision.label,
                        next = decision.next,
                        "routed"
                    );
                    emit(
                        &options,
                        GraphEvent::Routed {
                            node: current.clone(),
                            step: executed,
                            label: decision.label,
                            next: decision.next,
                        },
                    )
                    .await;
                    current = decision.next.to_string();
                }
            }
        }

        self.save(thread_id, &state, executed, END, &options).await?;
        Ok(RunOutcome { state, steps })
    }

    async fn save(
        &self,
        thread_id: Option<&str>,
        state: &GraphState<S>,
        step: usize,
        node: &str,
        options: &ExecutionOptions<S>,
    ) -> Result<(), GraphError> {
        let (Some(thread_id), Some(checkpointer)) = (thread_id, &self.checkpointer) else {
            return Ok(());
        };
        let checkpoint = Checkpoint::new(
            thread_id.to_string(),
            state.clone(),
            step as u64,
            node.to_string(),
        );
        checkpointer.save(&checkpoint).await?;
        tracing::debug!(thread_id, node, step, "checkpoint saved");
        emit(
            options,
            GraphEvent::CheckpointSaved {
                node: node.to_string(),
                step,
            },
        )
        .await;
        Ok(())
    }
}

async fn emit<S: StateSchema>(options: &ExecutionOptions<S>, event: GraphEvent<S>) {
    if let Some(sender) = &options.event_sender {
        // A dropped receiver means the caller stopped listening; the run goes on.
        let _ = sender.send(event).await;
    }
}
