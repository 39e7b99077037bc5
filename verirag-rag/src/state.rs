use serde::{Deserialize, Serialize};
use verirag_core::{Message, Role};
use verirag_graph::{Append, Reducer, StateSchema, StateUpdate};

/// The persisted conversation of one thread. Updates only ever append.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ConversationState {
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl StateSchema for ConversationState {
    type Update = ConversationState;

    fn apply(current: &Self, update: Self::Update) -> Self {
        Self {
            messages: Append.reduce(current.messages.clone(), update.messages),
        }
    }
}

impl ConversationState {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Index of the question under consideration: the latest message marked
    /// as a question, else the latest user message.
    pub fn active_question_index(&self) -> Option<usize> {
        self.messages
            .iter()
            .rposition(|message| message.is_question)
            .or_else(|| {
                self.messages
                    .iter()
                    .rposition(|message| message.role == Role::User)
            })
    }

    pub fn active_question(&self) -> Option<&Message> {
        self.active_question_index().map(|idx| &self.messages[idx])
    }

    /// Content of the active question, or `""` when there is none.
    pub fn question_text(&self) -> &str {
        self.active_question()
            .map(|message| message.content.as_str())
            .unwrap_or("")
    }

    /// Messages appended after the active question in the current turn.
    pub fn turn_artifacts(&self) -> &[Message] {
        match self.active_question_index() {
            Some(idx) => &self.messages[idx + 1..],
            None => &self.messages,
        }
    }

    /// Messages preceding the active question.
    pub fn history_before_question(&self) -> &[Message] {
        match self.active_question_index() {
            Some(idx) => &self.messages[..idx],
            None => &self.messages,
        }
    }

    /// The newest tool result of the current turn.
    pub fn turn_documents(&self) -> Option<&Message> {
        self.turn_artifacts()
            .iter()
            .rev()
            .find(|message| message.role == Role::Tool)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

pub fn append(messages: Vec<Message>) -> StateUpdate<ConversationState> {
    StateUpdate::new(ConversationState::new(messages))
}

/// Renders messages as `Human:` / `AI:` / `Tool (name):` lines for a prompt.
pub fn format_chat_history(messages: &[Message]) -> String {
    messages
        .iter()
        .filter_map(|message| match message.role {
            Role::User => Some(format!("Human: {}", message.content)),
            Role::Assistant => Some(format!("AI: {}", message.content)),
            Role::Tool => Some(format!(
                "Tool ({}): {}",
                message.tool_name.as_deref().unwrap_or("tool"),
                message.content
            )),
            Role::System => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}
