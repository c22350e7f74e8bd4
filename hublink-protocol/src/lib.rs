//! # hublink-protocol
//!
//! Wire protocol implementation for hub connections (JSON hub protocol).
//!
//! This crate provides:
//! - Record framing with the `0x1E` record separator
//! - JSON message serialization/deserialization
//! - Handshake and negotiate wire types
//! - Protocol constants

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;

pub use codec::{Decoder, Encoder};
pub use error::ProtocolError;
pub use frame::RECORD_SEPARATOR;
pub use message::{
    AvailableTransport, HandshakeRequest, HandshakeResponse, Message, MessageType,
    NegotiateResponse,
};

/// Hub protocol name sent in the handshake.
pub const PROTOCOL_NAME: &str = "json";

/// Hub protocol version supported by this implementation.
pub const PROTOCOL_VERSION: u32 = 1;

/// Transport name advertised by servers for WebSockets.
pub const WEBSOCKETS_TRANSPORT: &str = "WebSockets";
