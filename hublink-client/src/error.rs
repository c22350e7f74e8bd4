//! Client error types.

use hublink_protocol::ProtocolError;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Error type returned by message handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by a transport instance.
///
/// Socket-level failures leave the transport disconnected; decode failures
/// only abort the frame being processed.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[source] Box<tungstenite::Error>),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("handshake rejected by server: {0}")]
    HandshakeRejected(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("not connected")]
    NotConnected,

    #[error("transport timeout")]
    Timeout,

    #[error("TLS configuration error: {0}")]
    TlsConfig(String),
}

impl From<tungstenite::Error> for TransportError {
    fn from(err: tungstenite::Error) -> Self {
        TransportError::WebSocket(Box::new(err))
    }
}

/// Broad classification of client errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Negotiation or transport setup failed; fatal to the connect attempt.
    Connection,
    /// The connected transport failed while sending or receiving.
    Transport,
    /// The client was used out of order (e.g. invoking before connecting).
    Misuse,
    /// A registered handler returned an error.
    Handler,
}

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("negotiate request failed: {0}")]
    Negotiate(#[source] reqwest::Error),

    #[error("negotiate error: server returned {status} ({body})")]
    NegotiateStatus { status: u16, body: String },

    #[error("invalid negotiate response: {0}")]
    NegotiateBody(#[source] reqwest::Error),

    #[error("HTTP client configuration error: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("no available transport on the server (offered: {offered:?})")]
    NoTransport { offered: Vec<String> },

    #[error("transport error on connection: {0}")]
    Connect(#[source] TransportError),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("trying to invoke {target}() before connection")]
    InvokeBeforeConnection { target: String },

    #[error("not connected")]
    NotConnected,

    #[error("handler for {target} failed: {source}")]
    Handler {
        target: String,
        #[source]
        source: HandlerError,
    },
}

impl ClientError {
    /// Returns the error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Negotiate(_)
            | ClientError::NegotiateStatus { .. }
            | ClientError::NegotiateBody(_)
            | ClientError::HttpClient(_)
            | ClientError::NoTransport { .. }
            | ClientError::Connect(_)
            | ClientError::InvalidUrl(_) => ErrorKind::Connection,
            ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::InvokeBeforeConnection { .. } | ClientError::NotConnected => {
                ErrorKind::Misuse
            }
            ClientError::Handler { .. } => ErrorKind::Handler,
        }
    }

    /// Returns whether this error ended a connect attempt.
    pub fn is_connection_error(&self) -> bool {
        self.kind() == ErrorKind::Connection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_kinds() {
        let err = ClientError::NegotiateStatus {
            status: 404,
            body: "Not Found".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.is_connection_error());

        let err = ClientError::NoTransport { offered: vec![] };
        assert_eq!(err.kind(), ErrorKind::Connection);

        let err = ClientError::Connect(TransportError::ConnectionClosed);
        assert_eq!(err.kind(), ErrorKind::Connection);

        let err = ClientError::from(TransportError::ConnectionClosed);
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(!err.is_connection_error());

        let err = ClientError::InvokeBeforeConnection {
            target: "Test".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Misuse);

        let err = ClientError::Handler {
            target: "Test".to_string(),
            source: "boom".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Handler);
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::NegotiateStatus {
            status: 500,
            body: "oops".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "negotiate error: server returned 500 (oops)"
        );

        let err = ClientError::InvokeBeforeConnection {
            target: "Test".to_string(),
        };
        assert!(err.to_string().contains("Test()"));

        let err = TransportError::HandshakeRejected("bad protocol".to_string());
        assert!(err.to_string().contains("bad protocol"));
    }

    #[test]
    fn test_source_is_preserved() {
        let err = ClientError::Connect(TransportError::Protocol(
            ProtocolError::IncompleteMessage,
        ));
        let source = err.source().expect("connect error has a source");
        assert!(source.to_string().contains("protocol error"));

        let err = ClientError::Handler {
            target: "requestStep".to_string(),
            source: "bad move".into(),
        };
        assert_eq!(err.source().unwrap().to_string(), "bad move");
    }
}
