use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use futures::stream::{BoxStream, StreamExt};
use http_body_util::BodyExt;
use tower::ServiceExt;
use verirag_core::{
    LlmRequest, LlmResponse, ResponseFormat, Runnable, SearchTool, StreamEvent, VeriragError,
};
use verirag_rag::VeriragRag;
use verirag_server::{router, AppState, DEFAULT_THREAD_ID};

const ANSWER: &str = "Paris is the capital of France.";

/// Grades everything "yes" and answers every free-text prompt the same way.
#[derive(Clone)]
struct AgreeableLlm;

#[async_trait::async_trait]
impl Runnable<LlmRequest, LlmResponse> for AgreeableLlm {
    async fn invoke(&self, input: LlmRequest) -> Result<LlmResponse, VeriragError> {
        let content = if input.response_format == Some(ResponseFormat::JsonObject) {
            r#"{"grade": "yes"}"#.to_string()
        } else {
            ANSWER.to_string()
        };
        Ok(LlmResponse { content })
    }

    fn stream(&self, _input: LlmRequest) -> BoxStream<'_, Result<StreamEvent, VeriragError>> {
        futures::stream::empty().boxed()
    }
}

struct FixedSearch(Result<&'static str, &'static str>);

#[async_trait::async_trait]
impl SearchTool for FixedSearch {
    fn name(&self) -> &str {
        "retrieve_documents"
    }

    async fn search(&self, _query: &str) -> Result<String, VeriragError> {
        self.0
            .map(str::to_string)
            .map_err(|reason| VeriragError::Custom(reason.to_string()))
    }
}

fn state(search: FixedSearch) -> AppState {
    AppState::new(
        VeriragRag::builder()
            .with_llm(AgreeableLlm)
            .with_search_tool(search)
            .build()
            .unwrap(),
    )
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(state: AppState, request: Request<Body>) -> (StatusCode, String, String) {
    let response = router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn chat_streams_the_answer_as_plain_text() {
    let state = state(FixedSearch(Ok("Paris is the capital of France.")));
    let (status, content_type, body) = send(
        state.clone(),
        post_json(
            "/chat",
            serde_json::json!({"message": "What is the capital of France?", "thread_id": "web-1"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/plain"));
    assert_eq!(body, ANSWER);
    assert_eq!(state.rag().history("web-1").await.unwrap().len(), 3);
}

#[tokio::test]
async fn chat_without_thread_id_uses_the_default_thread() {
    let state = state(FixedSearch(Ok("Paris is the capital of France.")));
    send(
        state.clone(),
        post_json("/chat", serde_json::json!({"message": "Capital of France?"})),
    )
    .await;

    let history = state.rag().history(DEFAULT_THREAD_ID).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].content, "Capital of France?");
}

#[tokio::test]
async fn chat_failure_is_a_single_error_line() {
    let (status, _, body) = send(
        state(FixedSearch(Err("index offline"))),
        post_json("/chat", serde_json::json!({"message": "anything"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("Error: "));
    assert!(body.contains("index offline"));
    assert_eq!(body.lines().count(), 1);
}

#[tokio::test]
async fn chat_events_end_with_answer_then_done() {
    let (status, content_type, body) = send(
        state(FixedSearch(Ok("Paris is the capital of France."))),
        post_json("/chat/events", serde_json::json!({"message": "Capital?"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "text/event-stream");

    let kinds: Vec<&str> = body
        .lines()
        .filter_map(|line| line.strip_prefix("event: "))
        .collect();
    assert_eq!(kinds.iter().filter(|k| **k == "answer").count(), 1);
    assert!(kinds.contains(&"status"));
    assert!(kinds.contains(&"trace"));
    assert_eq!(&kinds[kinds.len() - 2..], &["answer", "done"]);
}

#[tokio::test]
async fn chat_events_report_failures_as_error_frames() {
    let (_, _, body) = send(
        state(FixedSearch(Err("index offline"))),
        post_json("/chat/events", serde_json::json!({"message": "Capital?"})),
    )
    .await;

    assert!(body.contains("event: error"));
    assert!(!body.contains("event: answer"));
    assert!(body.ends_with("event: done\ndata: {}\n\n"));
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let (status, _, _) = send(
        state(FixedSearch(Ok(""))),
        post_json("/chat", serde_json::json!({"thread_id": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn uploaded_documents_are_listed_once_per_file() {
    let state = state(FixedSearch(Ok("")));
    let (_, _, body) = send(state.clone(), get("/document")).await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["documents"], serde_json::json!([]));

    let (status, _, body) = send(
        state.clone(),
        post_json(
            "/document/upload",
            serde_json::json!({"filename": "france.md", "content": "Paris is the capital.\n\nLyon is on the Rhone."}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["filename"], "france.md");
    assert_eq!(json["chunks"], 2);
    assert_eq!(json["document_id"].as_str().unwrap().len(), 64);

    send(
        state.clone(),
        post_json(
            "/document/upload",
            serde_json::json!({"filename": "notes.txt", "content": "Bordeaux makes wine."}),
        ),
    )
    .await;

    let (status, _, body) = send(state, get("/document")).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["documents"], serde_json::json!(["france.md", "notes.txt"]));
}

#[tokio::test]
async fn upload_rejects_other_formats_and_empty_text() {
    let state = state(FixedSearch(Ok("")));
    for (filename, content) in [("report.pdf", "%PDF-1.7"), ("empty.md", "  \n\n ")] {
        let (status, _, body) = send(
            state.clone(),
            post_json(
                "/document/upload",
                serde_json::json!({"filename": filename, "content": content}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{filename}");
        assert!(body.contains("error"));
    }
    assert!(state.documents().sources().await.is_empty());
}

#[tokio::test]
async fn health_reports_ok() {
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(state(FixedSearch(Ok(""))), request).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
}
