//! chat-protocol
//!
//! Wire-level encoding/decoding for the chat relay.
//!
//! This crate is responsible for turning [`chat_core::Message`] values
//! into bytes and back again.
//!
//! - [`json_codec`] : one message <-> one JSON payload (datagrams)
//! - [`framing`]    : length-prefixed payloads over a byte stream

pub mod wire_types;
pub mod json_codec;
pub mod framing;

pub use json_codec::{decode, decode_datagram, encode, encode_datagram, CodecError};
pub use framing::{encode_frame, frame, FrameDecoder, FrameError};
