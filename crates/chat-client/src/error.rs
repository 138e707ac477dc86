use std::io;

use chat_core::RejectReason;
use chat_protocol::{CodecError, FrameError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("registration rejected: {}", .0.describe())]
    Rejected(RejectReason),

    #[error("connection closed by server")]
    Closed,

    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("server error: {0}")]
    Server(String),

    #[error("unknown protocol: {0} (expected tcp or udp)")]
    UnknownProtocol(String),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Console input that is not a valid command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("usage: /p <name> <message>")]
    PrivateUsage,

    #[error("unknown command: {0} (try /ayuda)")]
    Unknown(String),
}
