// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the transport, the chat pipeline and the shell.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a chat session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generates a fresh random session id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Unique identifier for a turn within a timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(pub String);

impl TurnId {
    /// Generates a fresh random turn id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Author of a turn.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Assistant,
    System,
}

/// Lifecycle state of a turn.
///
/// User and system turns are created `Complete`. Assistant turns start
/// `Pending`, become `Streaming` on the first token and end in either
/// `Complete` or `Error`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TurnState {
    #[default]
    Pending,
    Streaming,
    Complete,
    Error,
}

impl TurnState {
    /// Pending or streaming.
    pub fn is_in_flight(self) -> bool {
        matches!(self, TurnState::Pending | TurnState::Streaming)
    }

    /// Complete or error. Terminal turns ignore further stream events.
    pub fn is_terminal(self) -> bool {
        !self.is_in_flight()
    }
}

/// Kind of attachment carried by a turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttachmentKind {
    File,
    Image,
}

/// A file or image attached to a user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub kind: AttachmentKind,
    /// Text content for files, base64 data for images.
    pub payload: String,
    pub mime_type: String,
}

/// One message in a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub id: TurnId,
    pub role: Role,
    pub text: String,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub model: Option<String>,
    pub state: TurnState,
}

impl Turn {
    /// A completed user turn.
    pub fn user(text: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            id: TurnId::generate(),
            role: Role::User,
            text: text.into(),
            attachments,
            created_at: Utc::now(),
            model: None,
            state: TurnState::Complete,
        }
    }

    /// A completed system turn.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            ..Self::user(text, Vec::new())
        }
    }

    /// An empty assistant turn waiting for its first token.
    pub fn pending_assistant(model: impl Into<String>) -> Self {
        Self {
            id: TurnId::generate(),
            role: Role::Assistant,
            text: String::new(),
            attachments: Vec::new(),
            created_at: Utc::now(),
            model: Some(model.into()),
            state: TurnState::Pending,
        }
    }
}

// --- Wire protocol ---

/// One decoded line of the NDJSON response stream.
///
/// ```text
/// {"token":"He","done":false}
/// {"token":"","done":true,"model":"m1","totalTokens":5}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Token text. Absent or `null` decodes as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub token: String,
    /// Required: an object without `done` is not a frame.
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, alias = "total_tokens", skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl Frame {
    pub fn token(text: impl Into<String>) -> Self {
        Self {
            token: text.into(),
            ..Self::default()
        }
    }

    pub fn terminal(model: Option<String>, total_tokens: Option<u64>) -> Self {
        Self {
            token: String::new(),
            done: true,
            model,
            total_tokens,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Normalized event emitted by the stream controller for one assistant turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental text.
    Token(String),
    /// The stream finished normally.
    Completed {
        model: Option<String>,
        total_tokens: Option<u64>,
    },
    /// The stream could not be opened or broke off before completing.
    Failed { reason: String },
}

impl StreamEvent {
    /// `Completed` and `Failed` are terminal; exactly one ends every stream.
    pub fn is_terminal(&self) -> bool {
        match self {
            StreamEvent::Token(_) => false,
            StreamEvent::Completed { .. } | StreamEvent::Failed { .. } => true,
        }
    }
}

/// A message in the request history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

/// Body of the streaming chat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub stream: bool,
}

/// Health status reported by transport health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Endpoint is up and at least one provider can serve requests.
    Healthy,
    /// Endpoint is up but cannot serve chat requests right now.
    Degraded(String),
    /// Endpoint is not reachable or reported an error.
    Unhealthy(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn frame_accepts_both_total_token_spellings() {
        let camel: Frame =
            serde_json::from_str(r#"{"token":"","done":true,"totalTokens":5}"#).unwrap();
        let snake: Frame =
            serde_json::from_str(r#"{"token":"","done":true,"total_tokens":5}"#).unwrap();
        assert_eq!(camel.total_tokens, Some(5));
        assert_eq!(snake.total_tokens, Some(5));
    }

    #[test]
    fn terminal_frame_may_omit_token() {
        let frame: Frame = serde_json::from_str(r#"{"done":true,"model":"m1"}"#).unwrap();
        assert_eq!(frame.token, "");
        assert!(frame.done);
        assert_eq!(frame.model.as_deref(), Some("m1"));

        let null_token: Frame = serde_json::from_str(r#"{"token":null,"done":true}"#).unwrap();
        assert_eq!(null_token.token, "");
    }

    #[test]
    fn frame_rejects_non_object_json() {
        assert!(serde_json::from_str::<Frame>("42").is_err());
        assert!(serde_json::from_str::<Frame>(r#"{"token":7,"done":false}"#).is_err());
    }

    #[test]
    fn frame_requires_done() {
        assert!(serde_json::from_str::<Frame>("{}").is_err());
        assert!(serde_json::from_str::<Frame>(r#"{"error":"overloaded"}"#).is_err());
        assert!(serde_json::from_str::<Frame>(r#"{"token":"a"}"#).is_err());
    }

    #[test]
    fn chat_request_uses_camel_case_on_the_wire() {
        let request = ChatRequest {
            model: "m1".into(),
            messages: vec![WireMessage {
                role: Role::User,
                content: "hi".into(),
            }],
            max_tokens: 64,
            temperature: None,
            system: None,
            stream: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["maxTokens"], 64);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["stream"], true);
        assert!(json.get("temperature").is_none());
        assert!(json.get("system").is_none());
    }

    #[test]
    fn turn_state_classification() {
        assert!(TurnState::Pending.is_in_flight());
        assert!(TurnState::Streaming.is_in_flight());
        assert!(TurnState::Complete.is_terminal());
        assert!(TurnState::Error.is_terminal());
    }

    #[test]
    fn role_and_state_round_trip_through_strings() {
        for role in [Role::User, Role::Assistant, Role::System] {
            assert_eq!(Role::from_str(&role.to_string()).unwrap(), role);
        }
        assert_eq!(TurnState::Streaming.to_string(), "streaming");
        assert_eq!(AttachmentKind::from_str("image").unwrap(), AttachmentKind::Image);
    }

    #[test]
    fn pending_assistant_records_requested_model() {
        let turn = Turn::pending_assistant("m1");
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.state, TurnState::Pending);
        assert_eq!(turn.model.as_deref(), Some("m1"));
        assert!(turn.text.is_empty());
    }
}
