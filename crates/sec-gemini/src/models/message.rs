use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// The kind of a message exchanged with the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageType {
    Result,
    Query,
    Source,
    Thinking,
    Info,
    Debug,
    Error,
    /// Any tag this client does not know about yet
    #[serde(other)]
    Unknown,
}

/// One unit of conversational content.
///
/// Locally built messages always carry a type and content. Messages received
/// from the service may omit either, so both are optional on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message_type: Option<MessageType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

impl Message {
    pub fn new<S: Into<String>>(message_type: MessageType, content: S) -> Self {
        Self {
            message_type: Some(message_type),
            content: Some(content.into()),
        }
    }

    /// Create a `result` message, the type used for analysis queries
    pub fn result<S: Into<String>>(content: S) -> Self {
        Self::new(MessageType::Result, content)
    }

    pub fn message_type(&self) -> Option<MessageType> {
        self.message_type
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// The content, if present and non-empty
    pub fn text(&self) -> Option<&str> {
        self.content().filter(|content| !content.is_empty())
    }
}

/// An ordered list of messages sent as one analysis query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub messages: Vec<Message>,
}

impl GenerateRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// A request holding a single `result` message
    pub fn single<S: Into<String>>(content: S) -> Self {
        Self::new(vec![Message::result(content)])
    }
}

/// The ordered list of messages returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub messages: Vec<Message>,
}

impl GenerateResponse {
    /// Non-empty contents in the order the service emitted them
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().filter_map(Message::text)
    }

    /// All non-empty contents joined by newlines
    pub fn text(&self) -> String {
        self.texts().collect::<Vec<_>>().join("\n")
    }
}
