use serde::{Deserialize, Serialize};
use verirag_core::{LlmResponse, Runnable, StrOutputParser, StructuredOutputParser, VeriragError};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Grade {
    grade: String,
}

fn response(content: &str) -> LlmResponse {
    LlmResponse {
        content: content.to_string(),
    }
}

#[tokio::test]
async fn str_output_parser_returns_content() {
    let output = StrOutputParser.invoke(response("Hello from LLM")).await.unwrap();
    assert_eq!(output, "Hello from LLM");
}

#[tokio::test]
async fn structured_parser_reads_plain_json() {
    let parser = StructuredOutputParser::<Grade>::new();
    let grade = parser.invoke(response(r#"{"grade": "yes"}"#)).await.unwrap();
    assert_eq!(grade.grade, "yes");
}

#[tokio::test]
async fn structured_parser_strips_markdown_fence() {
    let parser = StructuredOutputParser::<Grade>::new();
    let fenced = "```json\n{\n  \"grade\": \"no\"\n}\n```";
    let grade = parser.invoke(response(fenced)).await.unwrap();
    assert_eq!(grade.grade, "no");
}

#[tokio::test]
async fn structured_parser_rejects_empty_and_garbage() {
    let parser = StructuredOutputParser::<Grade>::new();

    let err = parser.invoke(response("   ")).await.unwrap_err();
    assert!(matches!(err, VeriragError::ParseFailed { .. }));

    let err = parser.invoke(response("definitely")).await.unwrap_err();
    match err {
        VeriragError::ParseFailed { output, .. } => assert_eq!(output, "definitely"),
        other => panic!("expected ParseFailed, got {other:?}"),
    }
}
