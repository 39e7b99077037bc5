use serde::{Deserialize, Serialize};
use verirag_core::{Llm, Message, Runnable, StructuredOutputParser, VeriragError};
use verirag_graph::RouteLabel;

use crate::prompts::GRADE_FORMAT_INSTRUCTION;
use crate::ModelSettings;

/// Structured yes/no verdict returned by a grading request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Grade {
    pub grade: String,
}

impl Grade {
    pub fn is_yes(&self) -> bool {
        self.grade.trim().eq_ignore_ascii_case("yes")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Answerability {
    Answerable,
    NotAnswerable,
}

impl RouteLabel for Answerability {
    const ALL: &'static [Self] = &[Self::Answerable, Self::NotAnswerable];

    fn label(&self) -> &'static str {
        match self {
            Self::Answerable => "answerable",
            Self::NotAnswerable => "not answerable",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grounding {
    Useful,
    NotSupported,
}

impl RouteLabel for Grounding {
    const ALL: &'static [Self] = &[Self::Useful, Self::NotSupported];

    fn label(&self) -> &'static str {
        match self {
            Self::Useful => "useful",
            Self::NotSupported => "not supported",
        }
    }
}

pub(crate) async fn request_grade(
    llm: &dyn Llm,
    settings: &ModelSettings,
    prompt: String,
) -> Result<Grade, VeriragError> {
    let request = settings.structured(vec![
        Message::system(GRADE_FORMAT_INSTRUCTION),
        Message::user(prompt),
    ]);
    let response = llm.invoke(request).await?;
    StructuredOutputParser::<Grade>::new().invoke(response).await
}
