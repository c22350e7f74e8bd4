//! Encoder and decoder for hub protocol records.

use crate::error::ProtocolError;
use crate::frame::{self, RECORD_SEPARATOR};
use crate::message::{HandshakeResponse, Message};
use bytes::Bytes;

/// Encodes messages into terminated records.
pub struct Encoder;

impl Encoder {
    /// Encodes a message as JSON followed by the record separator.
    pub fn encode(message: &Message) -> Result<Bytes, ProtocolError> {
        Self::encode_json(message)
    }

    /// Encodes a value as a terminated record for text frames.
    pub fn encode_text<T: serde::Serialize>(value: &T) -> Result<String, ProtocolError> {
        let mut text = serde_json::to_string(value)?;
        text.push(char::from(RECORD_SEPARATOR));
        Ok(text)
    }

    /// Encodes any JSON-serializable value as a terminated record.
    pub fn encode_json<T: serde::Serialize>(value: &T) -> Result<Bytes, ProtocolError> {
        let payload = serde_json::to_vec(value)?;
        Ok(frame::pack(&payload))
    }
}

/// Decodes transport frames into messages.
///
/// Decoding is stateless: each call handles exactly one complete frame.
pub struct Decoder;

impl Decoder {
    /// Decodes every record in a frame, in wire order.
    pub fn decode_frame(frame: &[u8]) -> Result<Vec<Message>, ProtocolError> {
        Self::decode_records(frame)
    }

    /// Decodes every record in a frame into any deserializable type.
    pub fn decode_records<T: serde::de::DeserializeOwned>(
        frame: &[u8],
    ) -> Result<Vec<T>, ProtocolError> {
        frame::split_records(frame)?
            .into_iter()
            .map(decode_record::<T>)
            .collect()
    }

    /// Decodes the handshake reply frame.
    ///
    /// The first record is the handshake reply. Any records the server
    /// sent right behind it in the same frame are returned as messages.
    pub fn decode_handshake(
        frame: &[u8],
    ) -> Result<(HandshakeResponse, Vec<Message>), ProtocolError> {
        let mut records = frame::split_records(frame)?.into_iter();

        // split_records always yields at least one segment
        let first = records.next().unwrap_or_default();
        let response = HandshakeResponse::from_value(decode_record(first)?);

        let rest = records
            .map(decode_record::<Message>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((response, rest))
    }
}

fn decode_record<T: serde::de::DeserializeOwned>(record: &[u8]) -> Result<T, ProtocolError> {
    let json = std::str::from_utf8(record).map_err(|_| ProtocolError::InvalidUtf8)?;
    Ok(serde_json::from_str(json)?)
}
