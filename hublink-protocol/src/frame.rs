//! Record framing for the JSON hub protocol.
//!
//! Every JSON record on the wire is followed by a single record separator
//! byte. One transport frame may carry several records back to back:
//!
//! ```text
//! +-------------+------+-------------+------+-----+
//! | json record | 0x1E | json record | 0x1E | ... |
//! +-------------+------+-------------+------+-----+
//! ```
//!
//! There is no length prefix. A frame that does not end with the separator
//! is rejected outright; partial frames are never buffered across reads.

use crate::error::ProtocolError;
use bytes::{BufMut, Bytes, BytesMut};

/// Record separator terminating every JSON record (ASCII RS).
pub const RECORD_SEPARATOR: u8 = 0x1E;

/// Appends the record separator to a serialized record.
pub fn pack(record: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(record.len() + 1);
    buf.put_slice(record);
    buf.put_u8(RECORD_SEPARATOR);
    buf.freeze()
}

/// Returns whether the frame ends with the record separator.
pub fn is_terminated(frame: &[u8]) -> bool {
    frame.last() == Some(&RECORD_SEPARATOR)
}

/// Splits a transport frame into its records, without the separators.
///
/// The trailing empty segment after the final separator is discarded.
/// Empty segments in the middle of a frame are returned as-is and will
/// fail JSON decoding.
pub fn split_records(frame: &[u8]) -> Result<Vec<&[u8]>, ProtocolError> {
    if !is_terminated(frame) {
        return Err(ProtocolError::IncompleteMessage);
    }

    let body = &frame[..frame.len() - 1];
    Ok(body.split(|&b| b == RECORD_SEPARATOR).collect())
}
