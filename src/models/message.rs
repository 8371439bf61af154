//! Message-related models

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    #[serde(rename = "user")]
    User,
    /// The simulated assistant. Stored as `"ai"`.
    #[serde(rename = "ai")]
    Agent,
}

impl Sender {
    pub fn display_name(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Agent => "Gemini",
        }
    }
}

/// Message content: either text or an embedded image, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Text(String),
    /// A self-contained `data:` URI.
    Image(String),
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MessageRecord", into = "MessageRecord")]
pub struct Message {
    pub id: String,
    pub body: MessageBody,
    pub sender: Sender,
}

impl Message {
    pub fn text(id: String, text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id,
            body: MessageBody::Text(text.into()),
            sender,
        }
    }

    pub fn image(id: String, data_uri: impl Into<String>, sender: Sender) -> Self {
        Self {
            id,
            body: MessageBody::Image(data_uri.into()),
            sender,
        }
    }

    /// Text content, if this is a text message.
    pub fn as_text(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Text(text) => Some(text),
            MessageBody::Image(_) => None,
        }
    }
}

/// Stored layout: `{id, text?, image?, sender}`.
#[derive(Serialize, Deserialize)]
struct MessageRecord {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    sender: Sender,
}

/// A stored record that carries both a text and an image, or neither.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("message {0} has both text and image")]
    Both(String),
    #[error("message {0} has neither text nor image")]
    Neither(String),
}

impl TryFrom<MessageRecord> for Message {
    type Error = BodyError;

    fn try_from(record: MessageRecord) -> Result<Self, Self::Error> {
        let body = match (record.text, record.image) {
            (Some(text), None) => MessageBody::Text(text),
            (None, Some(image)) => MessageBody::Image(image),
            (Some(_), Some(_)) => return Err(BodyError::Both(record.id)),
            (None, None) => return Err(BodyError::Neither(record.id)),
        };
        Ok(Self {
            id: record.id,
            body,
            sender: record.sender,
        })
    }
}

impl From<Message> for MessageRecord {
    fn from(msg: Message) -> Self {
        let (text, image) = match msg.body {
            MessageBody::Text(text) => (Some(text), None),
            MessageBody::Image(image) => (None, Some(image)),
        };
        Self {
            id: msg.id,
            text,
            image,
            sender: msg.sender,
        }
    }
}
