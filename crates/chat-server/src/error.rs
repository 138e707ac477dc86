//! Error types for the relay.
//!
//! Everything here is per-participant and recovered locally, except
//! [`ServerError::Bind`], which is fatal at startup.

use std::io;
use std::time::Duration;

use chat_core::RejectReason;
use chat_protocol::{CodecError, FrameError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::types::Origin;

/// Failure to move bytes to or from one participant.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("send timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0} is not served by this transport")]
    WrongTarget(Origin),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// The message could not be encoded for this transport. Says nothing
    /// about whether the target is reachable.
    pub fn is_message_error(&self) -> bool {
        matches!(self, TransportError::Frame(_) | TransportError::Codec(_))
    }
}

/// Routing outcome reported back to a single sender.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("registration rejected: {0}")]
    Rejected(#[from] RejectReason),

    #[error("user not found: {0}")]
    RecipientNotFound(String),

    #[error("could not deliver to {0}")]
    Unreachable(String),

    #[error("message too large ({len} bytes, max {max})")]
    TooLarge { len: usize, max: usize },

    #[error("message cannot be encoded: {0}")]
    Unencodable(String),
}

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
