use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interpreter::{ParsedReply, ReplyState};

/// Content type sent with every captured image attachment.
pub const IMAGE_CONTENT_TYPE: &str = "image/*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for MessageRole {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
}

impl Attachment {
    pub fn image(data_url: impl Into<String>) -> Self {
        Self { url: data_url.into(), content_type: IMAGE_CONTENT_TYPE.to_string() }
    }
}

/// One conversation entry. `content` is the raw text as received; for a reply
/// still streaming it grows until the stream ends.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub reply: ReplyState,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), role, content)
    }

    pub fn with_id(id: impl Into<String>, role: MessageRole, content: impl Into<String>) -> Self {
        let content = content.into();
        let reply = ReplyState::settled(&content);
        Self {
            id: id.into(),
            role,
            content,
            attachments: Vec::new(),
            created_at: Utc::now(),
            reply,
        }
    }

    /// An empty assistant reply that will accumulate streamed chunks.
    pub fn streaming_reply() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: MessageRole::Assistant,
            content: String::new(),
            attachments: Vec::new(),
            created_at: Utc::now(),
            reply: ReplyState::Accumulating,
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn parsed(&self) -> Option<&ParsedReply> {
        self.reply.parsed()
    }

    pub fn variant_count(&self) -> usize {
        self.parsed().map_or(0, |p| p.variants().len())
    }

    pub fn variant(&self, index: usize) -> Option<&str> {
        self.parsed()
            .and_then(|p| p.variants().get(index))
            .map(String::as_str)
    }
}

/// Which variant of which assistant message is mirrored into the host preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSuggestion {
    pub message_id: String,
    pub variant_index: usize,
}

/// A building block the generator may use, with example source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub name: String,
    pub code: String,
    pub group: String,
}

/// Curated usage example appended to the instruction preamble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiExample {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Everything the host exposes about available building blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub snippets: Vec<Snippet>,
    #[serde(default)]
    pub examples: Vec<AiExample>,
}

/// A message as sent to the generation endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct WireMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(rename = "experimental_attachments", skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl From<&Message> for WireMessage {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id.clone(),
            role: m.role,
            content: m.content.clone(),
            attachments: m.attachments.clone(),
        }
    }
}

/// Outbound payload: the seeded preamble plus the conversation so far.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub messages: Vec<WireMessage>,
}

impl GenerationRequest {
    pub fn from_history(history: &[Message]) -> Self {
        Self { messages: history.iter().map(WireMessage::from).collect() }
    }

    /// The most recent user message, which is the prompt of this turn.
    pub fn prompt(&self) -> Option<&WireMessage> {
        self.messages.iter().rev().find(|m| m.role == MessageRole::User)
    }
}
