//! Graded retrieval-augmented answering over checkpointed conversation threads.
//!
//! Each question runs `retrieve`, grades whether the retrieved documents can
//! answer it, generates, grades the generation for grounding, and falls back
//! to a conservative context-free answer when either grade fails.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;
use verirag_core::{AgentEvent, Llm, Message, SearchTool};
use verirag_graph::{
    Checkpointer, ExecutableGraph, ExecutionConfig, GraphError, InMemoryCheckpointer, StateUpdate,
    ThreadLocks,
};

pub mod adapters;
mod config;
mod grade;
pub mod graph;
pub mod nodes;
pub mod prompts;
mod state;
pub mod stream;

pub use config::ModelSettings;
pub use grade::{Answerability, Grade, Grounding};
pub use state::{append, format_chat_history, ConversationState};

use stream::{to_agent_event, TerminalFilter};

const DEFAULT_EVENT_BUFFER: usize = 64;
const DEFAULT_MAX_STEPS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("missing component: {0}")]
    MissingComponent(&'static str),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl RagError {
    pub fn source_kind(&self) -> &'static str {
        match self {
            Self::MissingComponent(_) => "config",
            Self::Graph(_) => "graph",
            Self::Runtime(_) => "runtime",
        }
    }
}

#[derive(Clone, Debug)]
pub struct RagQueryRequest {
    pub query: String,
    pub thread_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RagQueryResponse {
    pub answer: String,
    pub thread_id: String,
}

#[derive(Clone)]
pub struct VeriragRag {
    graph: Arc<ExecutableGraph<ConversationState>>,
    checkpointer: Arc<dyn Checkpointer<ConversationState>>,
    event_buffer_size: usize,
}

pub struct VeriragRagBuilder {
    llm: Option<Arc<dyn Llm>>,
    search: Option<Arc<dyn SearchTool>>,
    checkpointer: Arc<dyn Checkpointer<ConversationState>>,
    thread_locks: ThreadLocks,
    settings: ModelSettings,
    max_steps: usize,
    event_buffer_size: usize,
}

/// A blank question adds nothing to the thread.
fn question_input(question: &str) -> StateUpdate<ConversationState> {
    if question.trim().is_empty() {
        StateUpdate::empty()
    } else {
        append(vec![Message::question(question)])
    }
}

impl VeriragRag {
    pub fn builder() -> VeriragRagBuilder {
        VeriragRagBuilder {
            llm: None,
            search: None,
            checkpointer: Arc::new(InMemoryCheckpointer::<ConversationState>::default()),
            thread_locks: ThreadLocks::new(),
            settings: ModelSettings::default(),
            max_steps: DEFAULT_MAX_STEPS,
            event_buffer_size: DEFAULT_EVENT_BUFFER,
        }
    }

    pub fn event_buffer_size(&self) -> usize {
        self.event_buffer_size
    }

    pub async fn query(&self, request: RagQueryRequest) -> Result<RagQueryResponse, RagError> {
        let thread_id = request
            .thread_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut stream = self
            .query_stream(RagQueryRequest {
                query: request.query,
                thread_id: Some(thread_id.clone()),
            })
            .await?;

        let mut answer = None;
        while let Some(event) = stream.next().await {
            match event? {
                AgentEvent::Final { content, .. } => answer = Some(content),
                AgentEvent::Error { message, .. } => return Err(RagError::Runtime(message)),
                _ => {}
            }
        }

        let answer = answer
            .ok_or_else(|| RagError::Runtime("run finished without an answer".to_string()))?;
        Ok(RagQueryResponse { answer, thread_id })
    }

    /// Runs one question and streams progress, then exactly one `Final` event
    /// or one error.
    pub async fn query_stream(
        &self,
        request: RagQueryRequest,
    ) -> Result<ReceiverStream<Result<AgentEvent, RagError>>, RagError> {
        let thread_id = request
            .thread_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let (mut graph_events, handle) = self.graph.clone().stream(
            thread_id.clone(),
            question_input(&request.query),
            self.event_buffer_size,
        );
        let (output_tx, output_rx) =
            mpsc::channel::<Result<AgentEvent, RagError>>(self.event_buffer_size);

        tokio::spawn(async move {
            let mut filter = TerminalFilter::new();
            let mut last_step = 0usize;

            while let Some(event) = graph_events.next().await {
                last_step = event.step();
                filter.observe(&event);
                if let Some(agent_event) = to_agent_event(&event, &thread_id) {
                    if output_tx.send(Ok(agent_event)).await.is_err() {
                        return;
                    }
                }
            }

            let last = match handle.await {
                Ok(Ok(_)) => match filter.finish() {
                    Some(content) => Ok(AgentEvent::Final {
                        content,
                        step: last_step.saturating_add(1),
                    }),
                    None => Err(RagError::Runtime(
                        "run finished without a terminal message".to_string(),
                    )),
                },
                Ok(Err(error)) => {
                    tracing::warn!(thread_id = %thread_id, error = %error, "run failed");
                    Err(RagError::Graph(error))
                }
                Err(join) => Err(RagError::Graph(GraphError::Join(join.to_string()))),
            };
            let _ = output_tx.send(last).await;
        });

        Ok(ReceiverStream::new(output_rx))
    }

    /// Submits `question` on `thread_id` and yields the answer as text: the
    /// terminal content, or one `Error: ...` line.
    pub async fn chat_lines(
        &self,
        thread_id: impl Into<String>,
        question: &str,
    ) -> ReceiverStream<String> {
        let (tx, rx) = mpsc::channel::<String>(1);
        let request = RagQueryRequest {
            query: question.to_string(),
            thread_id: Some(thread_id.into()),
        };

        match self.query_stream(request).await {
            Ok(mut events) => {
                tokio::spawn(async move {
                    while let Some(item) = events.next().await {
                        if let Some(line) = adapters::lines::to_line(&item) {
                            if tx.send(line).await.is_err() {
                                return;
                            }
                        }
                    }
                });
            }
            Err(error) => {
                let _ = tx.send(adapters::lines::error_line(error)).await;
            }
        }

        ReceiverStream::new(rx)
    }

    /// The checkpointed messages of a thread; empty for an unknown thread.
    pub async fn history(&self, thread_id: &str) -> Result<Vec<Message>, RagError> {
        Ok(self
            .checkpointer
            .load(thread_id)
            .await?
            .map(|checkpoint| checkpoint.state.data.messages)
            .unwrap_or_default())
    }
}

impl VeriragRagBuilder {
    pub fn with_llm<T>(mut self, llm: T) -> Self
    where
        T: Llm + 'static,
    {
        self.llm = Some(Arc::new(llm));
        self
    }

    pub fn with_search_tool<T>(mut self, search: T) -> Self
    where
        T: SearchTool + 'static,
    {
        self.search = Some(Arc::new(search));
        self
    }

    pub fn with_checkpointer<T>(mut self, checkpointer: T) -> Self
    where
        T: Checkpointer<ConversationState> + 'static,
    {
        self.checkpointer = Arc::new(checkpointer);
        self
    }

    /// Facades sharing a checkpointer should share these too, so turns on the
    /// same thread run one at a time across all of them.
    pub fn with_thread_locks(mut self, locks: ThreadLocks) -> Self {
        self.thread_locks = locks;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.settings.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.settings.temperature = temperature;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        if max_steps > 0 {
            self.max_steps = max_steps;
        }
        self
    }

    pub fn with_event_buffer_size(mut self, event_buffer_size: usize) -> Self {
        if event_buffer_size > 0 {
            self.event_buffer_size = event_buffer_size;
        }
        self
    }

    pub fn build(self) -> Result<VeriragRag, RagError> {
        let llm = self.llm.ok_or(RagError::MissingComponent("llm"))?;
        let search = self.search.ok_or(RagError::MissingComponent("search tool"))?;

        let graph = graph::rag_graph(llm, search, self.settings)
            .with_shared_checkpointer(self.checkpointer.clone())
            .with_thread_locks(self.thread_locks)
            .with_config(ExecutionConfig {
                max_steps: Some(self.max_steps),
            })
            .build()?;

        Ok(VeriragRag {
            graph: Arc::new(graph),
            checkpointer: self.checkpointer,
            event_buffer_size: self.event_buffer_size,
        })
    }
}
