//! HTTP front end for the graded RAG conversation.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Json, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tower_http::limit::RequestBodyLimitLayer;
use verirag_checkpoint_sqlite::SqliteCheckpointer;
use verirag_graph::FileCheckpointer;
use verirag_llm::OpenAiCompatibleClient;
use verirag_rag::adapters::sse::{done_event, error_event, to_sse_event};
use verirag_rag::{RagQueryRequest, VeriragRag, VeriragRagBuilder};
use verirag_retrieval::{
    HashEmbedder, InMemoryVectorStore, RetrievalError, Retriever, RetrieverTool, TextIndexer,
};

pub mod config;

pub use config::{ConfigError, Settings};

/// Thread used when a chat request does not name one.
pub const DEFAULT_THREAD_ID: &str = "1";
const MAX_BODY_BYTES: usize = 64 * 1024;
const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;
const UPLOAD_EXTENSIONS: &[&str] = &["txt", "md"];
const LLM_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

impl ChatRequest {
    fn thread_id(&self) -> String {
        self.thread_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_THREAD_ID.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct DocumentUpload {
    pub filename: String,
    pub content: String,
}

/// Paragraph index shared by the search tool and the document routes.
/// Cloning shares the underlying store.
#[derive(Clone, Default)]
pub struct DocumentLibrary {
    embedder: HashEmbedder,
    store: InMemoryVectorStore,
}

impl DocumentLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_tool(&self, top_k: usize) -> RetrieverTool<HashEmbedder, InMemoryVectorStore> {
        RetrieverTool::new(Retriever::new(self.embedder.clone(), self.store.clone()))
            .with_top_k(top_k)
    }

    fn indexer(&self) -> TextIndexer<HashEmbedder, InMemoryVectorStore> {
        TextIndexer::new(self.embedder.clone(), self.store.clone())
    }

    /// Indexes `text` under `source`, replacing whatever that source held before.
    pub async fn index_text(&self, source: &str, text: &str) -> Result<usize, RetrievalError> {
        let replaced = self.store.delete_source(source).await;
        if replaced > 0 {
            tracing::debug!(source = %source, paragraphs = replaced, "replacing document");
        }
        self.indexer().index_text(source, text).await
    }

    pub async fn index_dir(&self, dir: &std::path::Path) -> Result<usize, RetrievalError> {
        self.indexer().index_dir(dir).await
    }

    pub async fn sources(&self) -> Vec<String> {
        self.store.sources().await
    }
}

#[derive(Clone)]
pub struct AppState {
    rag: Arc<VeriragRag>,
    documents: DocumentLibrary,
}

impl AppState {
    pub fn new(rag: VeriragRag) -> Self {
        Self {
            rag: Arc::new(rag),
            documents: DocumentLibrary::new(),
        }
    }

    /// Uploads land in `documents`; pass the library the search tool reads.
    pub fn with_documents(mut self, documents: DocumentLibrary) -> Self {
        self.documents = documents;
        self
    }

    pub fn rag(&self) -> &VeriragRag {
        &self.rag
    }

    pub fn documents(&self) -> &DocumentLibrary {
        &self.documents
    }
}

pub fn router(state: AppState) -> Router {
    let chat = Router::new()
        .route("/chat", post(chat_handler))
        .route("/chat/events", post(chat_events_handler))
        .route("/health", get(health_handler))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));
    let documents = Router::new()
        .route("/document", get(list_documents_handler))
        .route("/document/upload", post(upload_document_handler))
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES));

    chat.merge(documents).with_state(state)
}

async fn chat_handler(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    let thread_id = request.thread_id();
    tracing::info!(thread_id = %thread_id, "chat request");

    let lines = state.rag.chat_lines(thread_id, &request.message).await;
    let body = Body::from_stream(lines.map(Ok::<_, Infallible>));
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

async fn chat_events_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let thread_id = request.thread_id();
    tracing::info!(thread_id = %thread_id, "chat events request");

    let query = RagQueryRequest {
        query: request.message,
        thread_id: Some(thread_id),
    };
    let frames = match state.rag.query_stream(query).await {
        Ok(events) => events
            .map(|item| match item {
                Ok(event) => to_sse_event(&event),
                Err(error) => error_event(&error),
            })
            .boxed(),
        Err(error) => stream::once(async move { error_event(&error) }).boxed(),
    };
    let frames = frames.chain(stream::once(async { done_event() }));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(frames.map(Ok::<_, Infallible>)),
    )
        .into_response()
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.into() })),
    )
        .into_response()
}

async fn upload_document_handler(
    State(state): State<AppState>,
    Json(upload): Json<DocumentUpload>,
) -> Response {
    let filename = upload.filename.trim();
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension {
        Some(ext) if UPLOAD_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => return bad_request("the file must be .txt or .md"),
    }
    if upload.content.trim().is_empty() {
        return bad_request("the document has no text");
    }

    let chunks = match state.documents.index_text(filename, &upload.content).await {
        Ok(chunks) => chunks,
        Err(error) => {
            tracing::error!(filename = %filename, error = %error, "document upload failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response();
        }
    };
    let document_id = format!("{:x}", Sha256::digest(upload.content.as_bytes()));
    tracing::info!(filename = %filename, chunks, "document uploaded");

    Json(json!({
        "filename": filename,
        "document_id": document_id,
        "chunks": chunks,
        "status": "Uploaded successfully",
    }))
    .into_response()
}

async fn list_documents_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "documents": state.documents.sources().await }))
}

/// Builds the document library, indexing `settings.docs_dir` when set.
pub async fn build_documents(settings: &Settings) -> anyhow::Result<DocumentLibrary> {
    let documents = DocumentLibrary::new();
    if let Some(dir) = &settings.docs_dir {
        let indexed = documents.index_dir(dir).await?;
        tracing::info!(dir = %dir.display(), chunks = indexed, "indexed documents");
    } else {
        tracing::warn!("VERIRAG_DOCS_DIR is not set; retrieval starts empty until documents are uploaded");
    }
    Ok(documents)
}

/// Picks the thread store: SQLite when a URL is set, else JSONL files when a
/// directory is set, else process memory.
pub async fn with_checkpointer(
    builder: VeriragRagBuilder,
    settings: &Settings,
) -> anyhow::Result<VeriragRagBuilder> {
    if let Some(url) = &settings.sqlite_url {
        tracing::info!(url = %url, "using sqlite checkpointer");
        let checkpointer = SqliteCheckpointer::builder(url.clone()).build().await?;
        return Ok(builder.with_checkpointer(checkpointer));
    }
    if let Some(dir) = &settings.checkpoint_dir {
        tracing::info!(dir = %dir.display(), "using file checkpointer");
        return Ok(builder.with_checkpointer(FileCheckpointer::new(dir)));
    }
    tracing::info!("using in-memory checkpointer");
    Ok(builder)
}

pub async fn build_rag(
    settings: &Settings,
    documents: &DocumentLibrary,
) -> anyhow::Result<VeriragRag> {
    let mut llm = OpenAiCompatibleClient::builder()
        .base_url(&settings.base_url)?
        .default_model(settings.chat_model.clone())
        .timeout(LLM_TIMEOUT);
    if let Some(api_key) = &settings.api_key {
        llm = llm.api_key(api_key.clone());
    }

    let builder = VeriragRag::builder()
        .with_llm(llm.build()?)
        .with_search_tool(documents.search_tool(settings.top_k))
        .with_model(settings.chat_model.clone())
        .with_temperature(settings.temperature)
        .with_max_steps(settings.max_steps);

    Ok(with_checkpointer(builder, settings).await?.build()?)
}
