//! Length-prefixed framing for stream transports.
//!
//! ```text
//! [0..4] : payload length (u32 BE, 1..=max_frame_len)
//! [4..]  : JSON payload (see `json_codec`)
//! ```
//!
//! A single socket read may carry several frames, or only part of one;
//! [`FrameDecoder`] buffers bytes until a whole frame is present.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chat_core::Message;
use thiserror::Error;

use crate::json_codec::{self, CodecError};
use crate::wire_types::{LENGTH_PREFIX_LEN, MAX_FRAME_LEN};

/// Framing violations. Any of these ends the stream connection.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("zero-length frame")]
    Empty,

    #[error("frame of {len} bytes exceeds limit of {max}")]
    TooLarge { len: usize, max: usize },

    #[error("stream closed mid-frame ({buffered} bytes buffered)")]
    Truncated { buffered: usize },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Append one length-prefixed frame for `msg` to `out`.
pub fn encode_frame(msg: &Message, out: &mut BytesMut) -> Result<(), FrameError> {
    let payload = json_codec::encode(msg)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge {
            len: payload.len(),
            max: MAX_FRAME_LEN,
        });
    }

    out.reserve(LENGTH_PREFIX_LEN + payload.len());
    out.put_u32(payload.len() as u32);
    out.extend_from_slice(&payload);
    Ok(())
}

/// Encode `msg` as a standalone frame.
pub fn frame(msg: &Message) -> Result<Bytes, FrameError> {
    let mut out = BytesMut::new();
    encode_frame(msg, &mut out)?;
    Ok(out.freeze())
}

/// Incremental frame decoder over a growing byte buffer.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    max_frame_len: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        FrameDecoder::with_max_frame_len(MAX_FRAME_LEN)
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        FrameDecoder::default()
    }

    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        FrameDecoder {
            buf: BytesMut::with_capacity(8 * 1024),
            max_frame_len,
        }
    }

    /// Feed raw bytes read from the stream.
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Buffer to read into directly (`AsyncReadExt::read_buf`).
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Bytes received but not yet consumed as frames.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Pop the next complete message, if one is buffered.
    ///
    /// `Ok(None)` means "need more bytes". Errors are not recoverable:
    /// the stream has lost sync and must be closed.
    pub fn next_message(&mut self) -> Result<Option<Message>, FrameError> {
        if self.buf.len() < LENGTH_PREFIX_LEN {
            return Ok(None);
        }

        let len = (&self.buf[..LENGTH_PREFIX_LEN]).get_u32() as usize;
        if len == 0 {
            return Err(FrameError::Empty);
        }
        if len > self.max_frame_len {
            return Err(FrameError::TooLarge {
                len,
                max: self.max_frame_len,
            });
        }

        let total = LENGTH_PREFIX_LEN + len;
        if self.buf.len() < total {
            self.buf.reserve(total - self.buf.len());
            return Ok(None);
        }

        self.buf.advance(LENGTH_PREFIX_LEN);
        let payload = self.buf.split_to(len);
        Ok(Some(json_codec::decode(&payload)?))
    }

    /// Check the buffer at end-of-stream: leftover bytes are a cut frame.
    pub fn finish(&self) -> Result<(), FrameError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(FrameError::Truncated {
                buffered: self.buf.len(),
            })
        }
    }
}
