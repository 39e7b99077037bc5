mod answerability;
mod fallback;
mod generate;
mod hallucination;
mod retrieve;

pub use answerability::AnswerabilityGrader;
pub use fallback::FallbackNode;
pub use generate::GenerateNode;
pub use hallucination::HallucinationGrader;
pub use retrieve::RetrieveNode;

use futures::stream::{BoxStream, StreamExt};
use verirag_core::{Llm, LlmRequest, Runnable, StreamEvent, VeriragError};

/// Streams the model's answer for a prompt that may have failed to render.
pub(crate) fn stream_completion(
    llm: &dyn Llm,
    request: Result<LlmRequest, VeriragError>,
) -> BoxStream<'_, Result<StreamEvent, VeriragError>> {
    match request {
        Ok(request) => llm.stream(request),
        Err(err) => futures::stream::once(async move { Err(err) }).boxed(),
    }
}
