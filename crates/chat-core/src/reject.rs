//! Reasons a REGISTER can be refused.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Registration rejection, reported to the requester only.
///
/// A full registry is always surfaced as [`RejectReason::Full`]; there is
/// no separate "capacity reached" code on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// Another participant already holds this name.
    NameInUse,

    /// The registry holds `capacity` participants.
    Full,

    /// The name breaks the rules in [`crate::name`].
    InvalidName,

    /// The datagram origin is already bound to a registered name.
    AlreadyRegistered,
}

impl RejectReason {
    /// Wire code carried as the REGISTER_FAIL content.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::NameInUse => "NameInUse",
            RejectReason::Full => "Full",
            RejectReason::InvalidName => "InvalidName",
            RejectReason::AlreadyRegistered => "AlreadyRegistered",
        }
    }

    /// Human readable explanation for front-ends.
    pub fn describe(&self) -> &'static str {
        match self {
            RejectReason::NameInUse => "that name is already in use",
            RejectReason::Full => "the chat room is full",
            RejectReason::InvalidName => "that name is not allowed",
            RejectReason::AlreadyRegistered => "this address is already registered",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for RejectReason {}

/// Unknown rejection code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown rejection reason: {0}")]
pub struct UnknownReason(pub String);

impl FromStr for RejectReason {
    type Err = UnknownReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NameInUse" => Ok(RejectReason::NameInUse),
            "Full" => Ok(RejectReason::Full),
            "InvalidName" => Ok(RejectReason::InvalidName),
            "AlreadyRegistered" => Ok(RejectReason::AlreadyRegistered),
            other => Err(UnknownReason(other.to_string())),
        }
    }
}
