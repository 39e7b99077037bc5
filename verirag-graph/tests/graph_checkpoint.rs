use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use verirag_core::{Runnable, StreamEvent, VeriragError};
use verirag_graph::{
    Checkpoint, Checkpointer, ExecutionConfig, ExecutionOptions, FileCheckpointer, GraphBuilder, GraphError,
    GraphState, HistoryCheckpointer, InMemoryCheckpointer, RouteLabel, Router, StateSchema,
    StateUpdate, END, INPUT_NODE,
};

#[derive(Clone, Default, Debug, Serialize, Deserialize, PartialEq)]
struct Tally {
    count: i32,
    trail: Vec<String>,
}

impl StateSchema for Tally {
    type Update = Tally;

    fn apply(current: &Self, update: Tally) -> Self {
        let mut trail = current.trail.clone();
        trail.extend(update.trail);
        Tally {
            count: current.count + update.count,
            trail,
        }
    }
}

struct AddOne;

#[async_trait::async_trait]
impl Runnable<GraphState<Tally>, StateUpdate<Tally>> for AddOne {
    async fn invoke(&self, _input: GraphState<Tally>) -> Result<StateUpdate<Tally>, VeriragError> {
        Ok(StateUpdate::new(Tally {
            count: 1,
            trail: Vec::new(),
        }))
    }

    fn stream(&self, _input: GraphState<Tally>) -> BoxStream<'_, Result<StreamEvent, VeriragError>> {
        futures::stream::empty().boxed()
    }
}

struct Explode;

#[async_trait::async_trait]
impl Runnable<GraphState<Tally>, StateUpdate<Tally>> for Explode {
    async fn invoke(&self, _input: GraphState<Tally>) -> Result<StateUpdate<Tally>, VeriragError> {
        Err(VeriragError::LlmProvider("upstream down".to_string()))
    }

    fn stream(&self, _input: GraphState<Tally>) -> BoxStream<'_, Result<StreamEvent, VeriragError>> {
        futures::stream::empty().boxed()
    }
}

#[derive(Clone, Copy, Debug)]
enum Loop {
    Again,
    Done,
}

impl RouteLabel for Loop {
    const ALL: &'static [Self] = &[Loop::Again, Loop::Done];

    fn label(&self) -> &'static str {
        match self {
            Loop::Again => "again",
            Loop::Done => "done",
        }
    }
}

struct EvenOut;

#[async_trait::async_trait]
impl Router<Tally> for EvenOut {
    type Route = Loop;

    async fn route(&self, state: &GraphState<Tally>) -> Result<Loop, VeriragError> {
        Ok(if state.data.count % 2 == 0 {
            Loop::Done
        } else {
            Loop::Again
        })
    }
}

fn note(text: &str) -> StateUpdate<Tally> {
    StateUpdate::new(Tally {
        count: 0,
        trail: vec![text.to_string()],
    })
}

fn graph_with<C: Checkpointer<Tally> + 'static>(checkpointer: C) -> GraphBuilder<Tally> {
    GraphBuilder::new()
        .add_node("add", AddOne)
        .add_conditional_node("even", EvenOut, |route| match route {
            Loop::Again => "add",
            Loop::Done => END,
        })
        .add_edge("add", "even")
        .set_entry("add")
        .with_checkpointer(checkpointer)
}

#[tokio::test]
async fn run_checkpoints_input_each_plain_node_and_end() {
    let checkpointer = InMemoryCheckpointer::<Tally>::default();
    let graph = graph_with(checkpointer.clone()).build().unwrap();

    graph
        .run("thread-1", note("hello"), ExecutionOptions::default())
        .await
        .unwrap();

    let history = checkpointer.list_checkpoints("thread-1").await.unwrap();
    let nodes: Vec<&str> = history.iter().map(|m| m.node.as_str()).collect();
    let steps: Vec<u64> = history.iter().map(|m| m.step).collect();
    assert_eq!(nodes, vec![INPUT_NODE, "add", "add", END]);
    assert_eq!(steps, vec![0, 1, 3, 4]);

    let latest = checkpointer.load("thread-1").await.unwrap().unwrap();
    assert_eq!(latest.state.data.count, 2);
    assert_eq!(latest.state.data.trail, vec!["hello"]);
}

#[tokio::test]
async fn second_run_resumes_from_latest_checkpoint() {
    let checkpointer = InMemoryCheckpointer::<Tally>::default();
    let graph = graph_with(checkpointer.clone()).build().unwrap();

    graph
        .run("thread-1", note("first"), ExecutionOptions::default())
        .await
        .unwrap();
    let outcome = graph
        .run("thread-1", note("second"), ExecutionOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.state.data.count, 4);
    assert_eq!(outcome.state.data.trail, vec!["first", "second"]);

    let other = checkpointer.load("thread-2").await.unwrap();
    assert!(other.is_none());
}

#[tokio::test]
async fn failed_node_keeps_merged_input() {
    let checkpointer = InMemoryCheckpointer::<Tally>::default();
    let graph = GraphBuilder::new()
        .add_node("boom", Explode)
        .add_edge("boom", END)
        .set_entry("boom")
        .with_checkpointer(checkpointer.clone())
        .build()
        .unwrap();

    let err = graph
        .run("t", note("question"), ExecutionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::NodeFailed { ref node, .. } if node == "boom"));
    assert!(err.to_string().contains("upstream down"));

    let latest = checkpointer.load("t").await.unwrap().unwrap();
    assert_eq!(latest.node, INPUT_NODE);
    assert_eq!(latest.state.data.trail, vec!["question"]);
}

#[tokio::test]
async fn exhausted_budget_checkpoints_before_failing() {
    let checkpointer = InMemoryCheckpointer::<Tally>::default();
    let graph = graph_with(checkpointer.clone())
        .with_config(ExecutionConfig { max_steps: Some(1) })
        .build()
        .unwrap();

    let err = graph
        .run("t", StateUpdate::empty(), ExecutionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::MaxStepsExceeded { max: 1, reached: 2 }));

    let latest = checkpointer.load("t").await.unwrap().unwrap();
    assert_eq!(latest.state.data.count, 1);
    assert_eq!(latest.step, 1);
}

#[tokio::test]
async fn file_checkpointer_persists_across_graphs() {
    let dir = tempfile::tempdir().unwrap();

    let graph = graph_with(FileCheckpointer::new(dir.path())).build().unwrap();
    graph
        .run("user/42", note("a"), ExecutionOptions::default())
        .await
        .unwrap();
    drop(graph);

    let checkpointer = FileCheckpointer::new(dir.path());
    let graph = graph_with(checkpointer.clone()).build().unwrap();
    let outcome = graph
        .run("user/42", note("b"), ExecutionOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.state.data.count, 4);

    let history = HistoryCheckpointer::<Tally>::list_checkpoints(&checkpointer, "user/42")
        .await
        .unwrap();
    assert_eq!(history.len(), 8);
    assert!(history.windows(2).all(|pair| pair[0].seq < pair[1].seq));
    assert!(checkpointer.thread_path("user/42").exists());
}

#[tokio::test]
async fn file_checkpointer_keeps_lookalike_threads_apart() {
    let dir = tempfile::tempdir().unwrap();
    let checkpointer = FileCheckpointer::new(dir.path());
    let graph = graph_with(checkpointer.clone()).build().unwrap();

    graph
        .run("alice/1", note("a"), ExecutionOptions::default())
        .await
        .unwrap();

    for other in ["alice_1", "alice:1", " alice_1", ".alice_1"] {
        let loaded: Option<Checkpoint<Tally>> =
            Checkpointer::<Tally>::load(&checkpointer, other).await.unwrap();
        assert!(loaded.is_none(), "{other:?} saw another thread's state");
    }

    let outcome = graph
        .run("alice_1", note("b"), ExecutionOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.state.data.trail, vec!["b".to_string()]);

    let first: Checkpoint<Tally> = Checkpointer::<Tally>::load(&checkpointer, "alice/1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.thread_id, "alice/1");
    assert_eq!(first.state.data.trail, vec!["a".to_string()]);
}
