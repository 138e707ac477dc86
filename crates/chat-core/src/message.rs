//! Message types exchanged between participants and the relay.
//!
//! A [`Message`] is an immutable value: kind, sender, free-text content
//! and a formatted local timestamp. The kind is a tagged enum so that
//! kind-specific fields are enforced by construction; a PRIVATE message
//! cannot exist without a recipient.
//!
//! On the wire this flattens to a single object:
//!
//! ```text
//! {"type": "PRIVATE", "recipient": "bob", "sender": "alice",
//!  "content": "yo", "timestamp": "2024-05-01 18:22:03"}
//! ```
//!
//! Note: encoders live in the `chat-protocol` crate; this module only
//! fixes the shape.

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::reject::RejectReason;

/// Sender name used for everything the relay itself produces.
pub const SERVER_SENDER: &str = "SERVER";

/// `strftime` format of [`Message::timestamp`].
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time in [`TIMESTAMP_FORMAT`].
pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// The kind of a message, with the fields only that kind carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    /// Join request; `sender` is the requested name.
    Register,

    /// Join accepted.
    RegisterOk,

    /// Join refused; content is a [`RejectReason`] code.
    RegisterFail,

    /// Public message for everybody except the sender.
    Broadcast,

    /// Message for exactly one participant.
    Private { recipient: String },

    /// Ask for the current participant names.
    ListUsers,

    /// Participant names, `, `-joined, in registration order.
    UserList,

    /// Leave the chat.
    Disconnect,

    /// Relay announcement (joins, departures, shutdown).
    ServerNotice,

    /// Relay error report for one participant.
    Error,
}

impl MessageKind {
    /// Wire name of the kind, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            MessageKind::Register => "REGISTER",
            MessageKind::RegisterOk => "REGISTER_OK",
            MessageKind::RegisterFail => "REGISTER_FAIL",
            MessageKind::Broadcast => "BROADCAST",
            MessageKind::Private { .. } => "PRIVATE",
            MessageKind::ListUsers => "LIST_USERS",
            MessageKind::UserList => "USER_LIST",
            MessageKind::Disconnect => "DISCONNECT",
            MessageKind::ServerNotice => "SERVER_NOTICE",
            MessageKind::Error => "ERROR",
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(flatten)]
    kind: MessageKind,

    sender: String,

    #[serde(default)]
    content: String,

    #[serde(default = "now_timestamp")]
    timestamp: String,
}

impl Message {
    /// Build a message stamped with the current local time.
    pub fn new(kind: MessageKind, sender: impl Into<String>, content: impl Into<String>) -> Self {
        Message {
            kind,
            sender: sender.into(),
            content: content.into(),
            timestamp: now_timestamp(),
        }
    }

    /// Replace the timestamp (replay, tests).
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn register(name: impl Into<String>) -> Self {
        Message::new(MessageKind::Register, name, "")
    }

    pub fn register_ok(content: impl Into<String>) -> Self {
        Message::new(MessageKind::RegisterOk, SERVER_SENDER, content)
    }

    pub fn register_fail(reason: RejectReason) -> Self {
        Message::new(MessageKind::RegisterFail, SERVER_SENDER, reason.as_str())
    }

    pub fn broadcast(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Message::new(MessageKind::Broadcast, sender, content)
    }

    pub fn private(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Message::new(
            MessageKind::Private {
                recipient: recipient.into(),
            },
            sender,
            content,
        )
    }

    pub fn list_users(sender: impl Into<String>) -> Self {
        Message::new(MessageKind::ListUsers, sender, "")
    }

    pub fn user_list<S: AsRef<str>>(names: &[S]) -> Self {
        let joined = names
            .iter()
            .map(|n| n.as_ref())
            .collect::<Vec<_>>()
            .join(", ");
        Message::new(MessageKind::UserList, SERVER_SENDER, joined)
    }

    pub fn disconnect(sender: impl Into<String>) -> Self {
        Message::new(MessageKind::Disconnect, sender, "")
    }

    pub fn server_notice(content: impl Into<String>) -> Self {
        Message::new(MessageKind::ServerNotice, SERVER_SENDER, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Message::new(MessageKind::Error, SERVER_SENDER, content)
    }

    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Recipient of a PRIVATE message.
    pub fn recipient(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::Private { recipient } => Some(recipient),
            _ => None,
        }
    }

    /// Names carried by a USER_LIST.
    pub fn users(&self) -> Option<Vec<&str>> {
        match self.kind {
            MessageKind::UserList if self.content.is_empty() => Some(Vec::new()),
            MessageKind::UserList => Some(self.content.split(", ").collect()),
            _ => None,
        }
    }

    /// Rejection carried by a REGISTER_FAIL.
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self.kind {
            MessageKind::RegisterFail => self.content.parse().ok(),
            _ => None,
        }
    }
}
