//! JSON payload codec.
//!
//! One message is one UTF-8 JSON object:
//!
//! ```text
//! {"type": <KIND>, "sender": <name>, "content": <text>,
//!  "recipient": <name, PRIVATE only>, "timestamp": "YYYY-MM-DD HH:MM:SS"}
//! ```
//!
//! A payload is not self-delimiting; stream transports wrap it with
//! [`crate::framing`], datagram transports send exactly one payload per
//! datagram.

use bytes::Bytes;
use chat_core::Message;
use thiserror::Error;

use crate::wire_types::MAX_DATAGRAM_LEN;

/// Errors that can arise when encoding/decoding a payload.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Nothing to decode.
    #[error("empty payload")]
    Empty,

    /// Not a well-formed message object (bad JSON, bad UTF-8, unknown
    /// `type`, PRIVATE without `recipient`, ...).
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Encoded payload does not fit the transport.
    #[error("payload of {len} bytes exceeds limit of {max}")]
    TooLarge { len: usize, max: usize },
}

/// Encode a single message into a JSON payload.
pub fn encode(msg: &Message) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(msg)?)
}

/// Decode a single message from a JSON payload.
///
/// The buffer must contain exactly one message.
pub fn decode(buf: &[u8]) -> Result<Message, CodecError> {
    if buf.is_empty() {
        return Err(CodecError::Empty);
    }
    Ok(serde_json::from_slice(buf)?)
}

/// Encode a message as one datagram.
pub fn encode_datagram(msg: &Message) -> Result<Bytes, CodecError> {
    let payload = encode(msg)?;
    if payload.len() > MAX_DATAGRAM_LEN {
        return Err(CodecError::TooLarge {
            len: payload.len(),
            max: MAX_DATAGRAM_LEN,
        });
    }
    Ok(Bytes::from(payload))
}

/// Decode one datagram. Callers drop the packet on error.
pub fn decode_datagram(datagram: &[u8]) -> Result<Message, CodecError> {
    decode(datagram)
}
