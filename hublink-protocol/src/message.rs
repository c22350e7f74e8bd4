//! JSON message types for the hub protocol.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;

/// Hub message types with their fixed wire values.
///
/// Numbers outside the known range decode to `Unknown` so that newer
/// servers cannot break older clients; the dispatcher ignores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Invocation,
    StreamItem,
    Completion,
    StreamInvocation,
    CancelInvocation,
    Ping,
    Close,
    Unknown(i64),
}

impl MessageType {
    /// Returns the wire value of this type.
    pub fn code(&self) -> i64 {
        match self {
            MessageType::Invocation => 1,
            MessageType::StreamItem => 2,
            MessageType::Completion => 3,
            MessageType::StreamInvocation => 4,
            MessageType::CancelInvocation => 5,
            MessageType::Ping => 6,
            MessageType::Close => 7,
            MessageType::Unknown(code) => *code,
        }
    }

    /// Maps a wire value to a message type.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => MessageType::Invocation,
            2 => MessageType::StreamItem,
            3 => MessageType::Completion,
            4 => MessageType::StreamInvocation,
            5 => MessageType::CancelInvocation,
            6 => MessageType::Ping,
            7 => MessageType::Close,
            other => MessageType::Unknown(other),
        }
    }
}

impl Serialize for MessageType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.code())
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = i64::deserialize(deserializer)?;
        Ok(MessageType::from_code(code))
    }
}

/// A single hub protocol record.
///
/// Which fields are meaningful depends on `message_type`. Fields that are
/// `None` are omitted on the wire, so a ping serializes as `{"type":6}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message type tag.
    #[serde(rename = "type")]
    pub message_type: MessageType,

    /// Target method name (invocations).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Positional arguments (invocations).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<Value>>,

    /// Invocation ID for calls expecting a completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<String>,

    /// Optional message headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,

    /// Stream item payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Value>,

    /// Completion result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error text (completions and close).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Whether the server allows the client to reconnect (close).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_reconnect: Option<bool>,
}

impl Message {
    /// Creates a message of the given type with no other fields set.
    pub fn new(message_type: MessageType) -> Self {
        Self {
            message_type,
            target: None,
            arguments: None,
            invocation_id: None,
            headers: None,
            item: None,
            result: None,
            error: None,
            allow_reconnect: None,
        }
    }

    /// Creates a non-blocking invocation of `target`.
    pub fn invocation(target: impl Into<String>, arguments: Vec<Value>) -> Self {
        let mut message = Self::new(MessageType::Invocation);
        message.target = Some(target.into());
        message.arguments = Some(arguments);
        message
    }

    /// Creates a ping message.
    pub fn ping() -> Self {
        Self::new(MessageType::Ping)
    }

    /// Creates a close message.
    pub fn close() -> Self {
        Self::new(MessageType::Close)
    }

    pub fn with_invocation_id(mut self, id: impl Into<String>) -> Self {
        self.invocation_id = Some(id.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Returns the target method name, if any.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Returns the arguments, or an empty slice when absent.
    pub fn arguments(&self) -> &[Value] {
        self.arguments.as_deref().unwrap_or(&[])
    }
}

/// First record sent by the client after the socket opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeRequest {
    pub protocol: String,
    pub version: u32,
}

impl HandshakeRequest {
    pub fn new(protocol: impl Into<String>, version: u32) -> Self {
        Self {
            protocol: protocol.into(),
            version,
        }
    }
}

impl Default for HandshakeRequest {
    fn default() -> Self {
        Self::new(crate::PROTOCOL_NAME, crate::PROTOCOL_VERSION)
    }
}

/// Handshake reply from the server.
///
/// An empty object means success. An object carrying `error` is a
/// rejection. Anything else is kept in `body` and tolerated.
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeResponse {
    /// Rejection reason supplied by the server.
    pub error: Option<String>,
    /// The raw reply body.
    pub body: Value,
}

impl HandshakeResponse {
    pub fn from_value(body: Value) -> Self {
        let error = body
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self { error, body }
    }

    /// Returns whether the server rejected the handshake.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Returns whether the reply is the canonical empty object.
    pub fn is_empty(&self) -> bool {
        matches!(&self.body, Value::Object(map) if map.is_empty())
    }
}

/// A transport advertised by the negotiate endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableTransport {
    /// Transport name, e.g. "WebSockets".
    pub transport: String,
    /// Supported transfer formats ("Text", "Binary").
    #[serde(default)]
    pub transfer_formats: Vec<String>,
}

/// Negotiate endpoint reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiateResponse {
    /// Connection ID assigned by the server.
    pub connection_id: String,

    /// Connection token (negotiate version 1 and later).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_token: Option<String>,

    /// Negotiate protocol version spoken by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negotiate_version: Option<u32>,

    /// Transports the server accepts for this connection.
    #[serde(default)]
    pub available_transports: Vec<AvailableTransport>,
}

impl NegotiateResponse {
    /// Returns whether the server offers the named transport.
    pub fn offers(&self, transport: &str) -> bool {
        self.available_transports
            .iter()
            .any(|t| t.transport == transport)
    }

    /// Returns the names of all offered transports, in server order.
    pub fn transport_names(&self) -> Vec<&str> {
        self.available_transports
            .iter()
            .map(|t| t.transport.as_str())
            .collect()
    }

    /// Returns the value to send as the `id` query parameter.
    ///
    /// Servers speaking negotiate version 1 expect the connection token
    /// rather than the connection ID.
    pub fn socket_id(&self) -> &str {
        self.connection_token
            .as_deref()
            .unwrap_or(&self.connection_id)
    }
}
