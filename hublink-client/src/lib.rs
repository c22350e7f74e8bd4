//! # hublink-client
//!
//! Client library for hub connections.
//!
//! This crate provides:
//! - Negotiate over HTTP and transport selection
//! - WebSocket transport with the JSON hub handshake
//! - Name-keyed handler dispatch with Close and Ping hooks
//! - Cooperative receive loop with a shutdown signal
//! - Optional TLS configuration (custom CA, insecure dev mode)

pub mod callback;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod negotiate;
pub mod shutdown;
pub mod tls;
pub mod transport;
pub mod websocket;

#[cfg(test)]
mod testing;

pub use callback::{
    handler_fn, CallbackRegistry, FnHandler, Handler, HandlerResult, PingReply, EXIT_HOOK,
    PING_HOOK,
};
pub use client::HubClient;
pub use config::{HubConfig, TlsClientConfig};
pub use error::{ClientError, ErrorKind, HandlerError, TransportError};
pub use negotiate::negotiate;
pub use shutdown::Shutdown;
pub use transport::{
    Transport, TransportFactory, TransportParams, TransportRegistry, TransportState,
};
pub use websocket::WebSocketTransport;
