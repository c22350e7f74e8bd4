//! Transport capability and registry.
//!
//! A transport owns one wire connection to the hub. The hub client only
//! talks to the [`Transport`] trait; concrete transports are looked up by
//! the name the negotiate endpoint advertises.

use crate::config::TlsClientConfig;
use crate::error::TransportError;
use crate::websocket::WebSocketTransport;
use async_trait::async_trait;
use hublink_protocol::{Message, WEBSOCKETS_TRANSPORT};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Lifecycle of a transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Unconnected,
    Connecting,
    Handshaking,
    Connected,
    Closing,
    Closed,
}

/// Wire transport between the client and a hub.
#[async_trait]
pub trait Transport: Send {
    /// Name of the transport as advertised by negotiate.
    fn name(&self) -> &'static str;

    /// Opens the connection and performs the protocol handshake.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Receives one frame and returns the messages it carries, in order.
    async fn receive(&mut self) -> Result<Vec<Message>, TransportError>;

    /// Sends a single message.
    async fn send(&mut self, message: &Message) -> Result<(), TransportError>;

    /// Sends an invocation of `target` with positional arguments.
    async fn invoke(&mut self, target: &str, arguments: Vec<Value>) -> Result<(), TransportError> {
        self.send(&Message::invocation(target, arguments)).await
    }

    /// Returns whether the transport holds an open connection.
    fn is_connected(&self) -> bool;

    /// Returns the current lifecycle state.
    fn state(&self) -> TransportState;

    /// Closes the connection.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Everything a transport needs to reach a negotiated hub connection.
#[derive(Debug, Clone)]
pub struct TransportParams {
    /// Hub URL (`<base>/<hub>`) with its original scheme.
    pub url: Url,
    /// Value for the `id` query parameter.
    pub connection_id: String,
    /// TLS configuration.
    pub tls: TlsClientConfig,
    /// Limit for socket connect plus handshake.
    pub connect_timeout: Option<Duration>,
    /// Limit for each frame read.
    pub receive_timeout: Option<Duration>,
}

impl TransportParams {
    pub fn new(url: Url, connection_id: impl Into<String>) -> Self {
        Self {
            url,
            connection_id: connection_id.into(),
            tls: TlsClientConfig::default(),
            connect_timeout: None,
            receive_timeout: None,
        }
    }
}

/// Constructor for a named transport.
pub type TransportFactory = Box<dyn Fn(TransportParams) -> Box<dyn Transport> + Send + Sync>;

/// Maps transport names to constructors.
pub struct TransportRegistry {
    factories: HashMap<String, TransportFactory>,
}

impl TransportRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Creates a registry with the built-in WebSocket transport.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(WEBSOCKETS_TRANSPORT, |params| {
            Box::new(WebSocketTransport::new(params))
        });
        registry
    }

    /// Registers a transport constructor, replacing any with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(TransportParams) -> Box<dyn Transport> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Returns whether a transport with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Constructs the named transport, or None if it is not registered.
    pub fn create(&self, name: &str, params: TransportParams) -> Option<Box<dyn Transport>> {
        self.factories.get(name).map(|factory| factory(params))
    }
}

impl Default for TransportRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRegistry")
            .field("transports", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> TransportParams {
        TransportParams::new(Url::parse("https://example.com/gameHub").unwrap(), "abc")
    }

    #[test]
    fn test_default_registry_has_websockets() {
        let registry = TransportRegistry::default();
        assert!(registry.contains("WebSockets"));
        assert_eq!(registry.names(), vec!["WebSockets"]);

        let transport = registry.create("WebSockets", params()).unwrap();
        assert_eq!(transport.name(), "WebSockets");
        assert!(!transport.is_connected());
        assert_eq!(transport.state(), TransportState::Unconnected);
    }

    #[test]
    fn test_unknown_transport() {
        let registry = TransportRegistry::with_defaults();
        assert!(registry.create("LongPolling", params()).is_none());
        assert!(!registry.contains("ServerSentEvents"));
    }

    #[test]
    fn test_empty_registry() {
        let registry = TransportRegistry::new();
        assert!(registry.names().is_empty());
        assert!(registry.create("WebSockets", params()).is_none());
    }

    #[test]
    fn test_register_custom_transport() {
        let mut registry = TransportRegistry::new();
        registry.register("Custom", |params| Box::new(WebSocketTransport::new(params)));
        assert!(registry.contains("Custom"));
        assert!(registry.create("Custom", params()).is_some());
        assert!(format!("{:?}", registry).contains("Custom"));
    }
}
