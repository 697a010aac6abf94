//! Message and Conversation domain types.
//!
//! These are the value objects that flow through one agent run:
//! the user's request, the model's turns (text and/or operation
//! requests), and the tool-result turns fed back to the model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation (one logical session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a turn in a conversation.
///
/// The system instruction is not a turn; it travels as a top-level
/// field of the provider request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user.
    User,
    /// The reasoning service.
    Model,
    /// Tool results fed back to the reasoning service.
    Tool,
}

/// A single content part within a turn.
///
/// A model turn may mix free text with operation requests; a
/// tool-result turn carries one `Response` part per request, in
/// request order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Part {
    /// Free text.
    Text { text: String },

    /// The model asks to execute a named operation.
    Call(ToolCall),

    /// The outcome of one operation, returned to the model.
    Response(ToolResponse),
}

/// A request from the model to execute a named operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the operation to execute.
    pub name: String,

    /// Argument name → value mapping.
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,
}

/// The result of one operation execution.
///
/// The payload is always a JSON object: on success the operation's
/// domain payload (non-object payloads are wrapped under `"result"`),
/// on failure a single `"error"` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Name of the operation this responds to.
    pub name: String,

    /// Object-shaped payload.
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl ToolResponse {
    /// Build an error-shaped response: `{"error": <text>}`.
    pub fn error(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut payload = serde_json::Map::new();
        payload.insert("error".into(), serde_json::Value::String(text.into()));
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Build a success response, wrapping non-object payloads under
    /// `"result"` to satisfy the uniform-shape contract.
    pub fn success(name: impl Into<String>, value: serde_json::Value) -> Self {
        let payload = match value {
            serde_json::Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("result".into(), other);
                map
            }
        };
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Whether this response carries an error payload.
    pub fn is_error(&self) -> bool {
        self.payload.contains_key("error")
    }
}

/// A single turn in a conversation: a role plus one or more parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID.
    pub id: String,

    /// Who produced this turn.
    pub role: Role,

    /// Ordered content parts.
    pub parts: Vec<Part>,

    /// Timestamp.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_parts(role: Role, parts: Vec<Part>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            parts,
            timestamp: Utc::now(),
        }
    }

    /// Create a user turn with a single text part.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_parts(
            Role::User,
            vec![Part::Text {
                text: content.into(),
            }],
        )
    }

    /// Create a model turn from arbitrary parts.
    pub fn model(parts: Vec<Part>) -> Self {
        Self::with_parts(Role::Model, parts)
    }

    /// Create a model turn with a single text part.
    pub fn model_text(content: impl Into<String>) -> Self {
        Self::model(vec![Part::Text {
            text: content.into(),
        }])
    }

    /// Create a tool-result turn bundling one response per executed
    /// operation, in request order.
    pub fn tool_results(responses: Vec<ToolResponse>) -> Self {
        Self::with_parts(
            Role::Tool,
            responses.into_iter().map(Part::Response).collect(),
        )
    }

    /// The operation requests in this turn, in emission order.
    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Call(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    /// All text parts of this turn joined with newlines.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// An ordered, append-only sequence of turns for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID.
    pub id: ConversationId,

    /// Ordered turns.
    pub messages: Vec<Message>,

    /// When this conversation was created.
    pub created_at: DateTime<Utc>,

    /// When the last turn was appended.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a turn.
    pub fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    /// Keep only the most recent `max_turns` turns.
    ///
    /// Callers persisting history between runs use this to bound what
    /// they re-supply. Trimming never splits a tool-result turn from
    /// the model turn that requested it: if the cut would land on a
    /// tool-result turn, the preceding model turn is kept too.
    pub fn trim_to(&mut self, max_turns: usize) {
        if self.messages.len() <= max_turns {
            return;
        }
        let mut start = self.messages.len() - max_turns;
        if self.messages[start].role == Role::Tool && start > 0 {
            start -= 1;
        }
        self.messages.drain(..start);
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
