//! The graphql-ws wire envelope and its message-type vocabulary.
//!
//! Every frame in either direction is one JSON object:
//! `{ "type": <string>, "id": <string?>, "payload": <any?> }`.
//! `type` stays a raw string after decoding so that frames with an
//! unrecognized type survive the codec and can be answered with a
//! `connection_error` that echoes the frame's `id`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client → server message types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientMessageType {
    /// Connection handshake; `payload` carries optional connection params.
    ConnectionInit,
    /// Begin a subscription operation under the frame's `id`.
    Start,
    /// Cancel the subscription operation named by the frame's `id`.
    Stop,
    /// Close the whole connection.
    ConnectionTerminate,
}

impl ClientMessageType {
    /// Classify a raw `type` string. Returns `None` for anything outside
    /// the client set.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "connection_init" => Some(Self::ConnectionInit),
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "connection_terminate" => Some(Self::ConnectionTerminate),
            _ => None,
        }
    }

    /// The wire string for this type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionInit => "connection_init",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::ConnectionTerminate => "connection_terminate",
        }
    }
}

impl std::fmt::Display for ClientMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One wire frame, either direction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationMessage {
    /// Raw message type.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Operation id, present when the frame is scoped to one operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Frame payload; its shape depends on `message_type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl OperationMessage {
    /// Acknowledges a successful `connection_init`.
    #[must_use]
    pub fn connection_ack() -> Self {
        Self {
            message_type: "connection_ack".to_owned(),
            id: None,
            payload: None,
        }
    }

    /// Reports a connection-level protocol failure.
    ///
    /// `id` echoes the offending frame's id when it carried one.
    #[must_use]
    pub fn connection_error(id: Option<String>, payload: Option<Value>) -> Self {
        Self {
            message_type: "connection_error".to_owned(),
            id,
            payload,
        }
    }

    /// Zero-payload keep-alive frame.
    #[must_use]
    pub fn keep_alive() -> Self {
        Self {
            message_type: "ka".to_owned(),
            id: None,
            payload: None,
        }
    }

    /// A successful execution result for one operation.
    #[must_use]
    pub fn data(id: impl Into<String>, payload: Value) -> Self {
        Self {
            message_type: "data".to_owned(),
            id: Some(id.into()),
            payload: Some(payload),
        }
    }

    /// An execution result carrying errors, or an operation-scoped failure.
    #[must_use]
    pub fn error(id: impl Into<String>, payload: Value) -> Self {
        Self {
            message_type: "error".to_owned(),
            id: Some(id.into()),
            payload: Some(payload),
        }
    }

    /// Marks the end of one operation's result stream.
    #[must_use]
    pub fn complete(id: impl Into<String>) -> Self {
        Self {
            message_type: "complete".to_owned(),
            id: Some(id.into()),
            payload: None,
        }
    }

    /// Classify this frame against the client message set.
    #[must_use]
    pub fn client_type(&self) -> Option<ClientMessageType> {
        ClientMessageType::parse(&self.message_type)
    }

    /// Serialize to the wire format. Total: every envelope this type can
    /// hold serializes successfully.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
